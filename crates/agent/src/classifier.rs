use async_trait::async_trait;

/// Structured decision produced by every classifier variant: conversation
/// topic, emotional tone in [-1, 1], whether to speak, and the text to send.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub topic: Option<String>,
    pub sentiment: f32,
    pub should_respond: bool,
    pub response: Option<String>,
}

impl ClassificationResult {
    /// Safe substitute when classification cannot complete in time.
    pub fn silent() -> Self {
        Self { topic: None, sentiment: 0.0, should_respond: false, response: None }
    }

    /// The text to emit, if any. A turn responds only when the flag is set
    /// AND the response text is non-empty; either one alone stays silent.
    pub fn outgoing_text(&self) -> Option<&str> {
        if !self.should_respond {
            return None;
        }
        self.response.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}

/// Maps a snapshot of recent human texts (plus an optional chat label) to a
/// decision. Implementations never fail: remote variants recover internally
/// and always hand back a usable result.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn decide(&self, texts: &[String], chat_label: Option<&str>) -> ClassificationResult;
}
