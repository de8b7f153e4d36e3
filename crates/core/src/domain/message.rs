use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Author {
    Human,
    Bot,
}

/// A single buffered chat message. Immutable once created; owned by the
/// context window that holds it and dropped when evicted by capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub author: Author,
}

impl Message {
    pub fn human(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { text: text.into(), timestamp, author: Author::Human }
    }

    pub fn bot(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { text: text.into(), timestamp, author: Author::Bot }
    }

    pub fn is_human(&self) -> bool {
        self.author == Author::Human
    }
}
