use async_trait::async_trait;

/// One chat update as delivered by the transport, in arrival order per chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingUpdate {
    pub update_id: i64,
    pub chat_id: String,
    pub chat_label: Option<String>,
    pub text: String,
    pub from_self: bool,
}

/// Port through which the runner hands human messages to the engagement
/// core. A non-empty return value is sent back to the chat verbatim.
#[async_trait]
pub trait GroupMessageService: Send + Sync {
    async fn process_incoming(
        &self,
        chat_id: &str,
        chat_label: Option<&str>,
        text: &str,
    ) -> Option<String>;
}

/// Placeholder service that never replies; used until the real gate is
/// wired in and by transport-level tests.
#[derive(Default)]
pub struct NoopGroupMessageService;

#[async_trait]
impl GroupMessageService for NoopGroupMessageService {
    async fn process_incoming(
        &self,
        _chat_id: &str,
        _chat_label: Option<&str>,
        _text: &str,
    ) -> Option<String> {
        None
    }
}
