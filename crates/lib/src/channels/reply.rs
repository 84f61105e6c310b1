//! Reply channel: sends generated text back to the conversation that produced an event.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("reply request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply api error: {0}")]
    Api(String),
}

/// Sends a plain text reply addressed by a platform-issued reply token.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Channel id (e.g. "line").
    fn id(&self) -> &str;
    /// Reply once to the event that issued `reply_token`.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ChannelError>;
}
