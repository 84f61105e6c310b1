//! Relay turn: send one inbound text to the completion backend and reply with the first choice.
//!
//! No history is kept; every event is a fresh single-message conversation.

use crate::channels::{ChannelError, ReplyChannel, TextMessageEvent, WebhookPayload};
use crate::llm::{ChatMessage, CompletionBackend, LlmError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Completion(#[from] LlmError),
    #[error("completion returned no text")]
    EmptyCompletion,
    #[error(transparent)]
    Reply(#[from] ChannelError),
}

/// A reply that was generated and accepted by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub reply_token: String,
    pub reply_text: String,
}

/// Counts for one webhook delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub relayed: usize,
    pub failed: usize,
}

/// Completion backend plus reply channel, shared by all requests.
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn CompletionBackend>,
    channel: Arc<dyn ReplyChannel>,
    model: String,
}

impl Relay {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        channel: Arc<dyn ReplyChannel>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            channel,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete `event.text` and reply to `event.reply_token`. The reply is not attempted when the completion fails.
    pub async fn relay_text(&self, event: &TextMessageEvent) -> Result<RelayOutcome, RelayError> {
        let messages = vec![ChatMessage::user(event.text.as_str())];
        let completion = self.backend.complete(&self.model, messages).await?;
        let reply_text = completion
            .first_content()
            .filter(|s| !s.trim().is_empty())
            .ok_or(RelayError::EmptyCompletion)?
            .to_string();
        self.channel.reply(&event.reply_token, &reply_text).await?;
        Ok(RelayOutcome {
            reply_token: event.reply_token.clone(),
            reply_text,
        })
    }

    /// Relay every text message in the payload, in order. Failures are logged and counted, never returned.
    pub async fn relay_payload(&self, payload: &WebhookPayload) -> RelayReport {
        let mut report = RelayReport::default();
        for event in payload.text_messages() {
            match self.relay_text(&event).await {
                Ok(outcome) => {
                    log::info!(
                        "relay: replied via {} ({} chars)",
                        self.channel.id(),
                        outcome.reply_text.chars().count()
                    );
                    report.relayed += 1;
                }
                Err(e) => {
                    log::error!("relay: failed to answer message: {}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
