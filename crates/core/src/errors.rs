use thiserror::Error;

/// Defensive invariant violations. These indicate a bug rather than an
/// environmental failure: they are logged loudly and the offending turn is
/// aborted in silence, never surfaced into the chat. Environmental failures
/// carry their own typed errors at each boundary (config, repository,
/// transport, sink).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn invariant_violation_carries_context() {
        let error = DomainError::InvariantViolation("sentiment 7.5 outside [-1, 1]".to_owned());
        assert_eq!(
            error.to_string(),
            "domain invariant violation: sentiment 7.5 outside [-1, 1]"
        );
    }
}
