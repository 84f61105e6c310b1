//! LINE channel: reply to webhook events via the Messaging API reply endpoint.

use crate::channels::reply::{ChannelError, ReplyChannel};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const LINE_API_BASE: &str = "https://api.line.me";

/// Text message objects longer than this many UTF-16 code units are rejected by the Messaging API.
const MAX_TEXT_UTF16: usize = 5000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    text: &'a str,
}

/// LINE Messaging API client (reply only).
pub struct LineChannel {
    id: String,
    access_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(
        access_token: impl Into<String>,
        api_base: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            id: "line".to_string(),
            access_token: access_token.into(),
            api_base,
            client,
        })
    }

    /// POST /v2/bot/message/reply with a single text message.
    pub async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let text = truncate_utf16(text, MAX_TEXT_UTF16);
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage { typ: "text", text }],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("reply failed: {} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplyChannel for LineChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        self.reply_text(reply_token, text).await
    }
}

/// Longest prefix of `text` that fits in `max` UTF-16 code units, cut on a char boundary.
fn truncate_utf16(text: &str, max: usize) -> &str {
    let mut units = 0;
    for (i, c) in text.char_indices() {
        units += c.len_utf16();
        if units > max {
            log::warn!("line: reply longer than {} UTF-16 units, truncating", max);
            return &text[..i];
        }
    }
    text
}
