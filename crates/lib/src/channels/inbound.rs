//! Inbound webhook payload: events delivered by the LINE platform in a single POST.
//!
//! Only text message events are relayed. Other event kinds (follow, postback, ...) and other message
//! kinds (image, sticker, ...) deserialize into catch-all variants and are skipped. Each event is
//! read on its own, so one unreadable event never fails the rest of the delivery.

use serde::{Deserialize, Deserializer};

/// Webhook request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_events")]
    pub events: Vec<WebhookEvent>,
}

fn lenient_events<'de, D>(deserializer: D) -> Result<Vec<WebhookEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| match serde_json::from_value::<WebhookEvent>(value) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("webhook: skipping unreadable event: {}", e);
                WebhookEvent::Unknown
            }
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Absent when the channel is not the active responder (e.g. `"mode":"standby"`).
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    pub message: MessageContent,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub source: Option<EventSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Where the event came from (user, group or room). Logged only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A text message to be answered: the single-use reply token and the user's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub reply_token: String,
    pub text: String,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Text message events that can be answered, in delivery order. Events without a reply token are skipped.
    pub fn text_messages(&self) -> Vec<TextMessageEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                WebhookEvent::Message(MessageEvent {
                    reply_token,
                    mode,
                    message: MessageContent::Text { text, .. },
                    ..
                }) => match reply_token {
                    Some(token) => Some(TextMessageEvent {
                        reply_token: token.clone(),
                        text: text.clone(),
                    }),
                    None => {
                        log::warn!(
                            "webhook: text message without reply token (mode {}), not answering",
                            mode.as_deref().unwrap_or("unknown")
                        );
                        None
                    }
                },
                WebhookEvent::Message(_) | WebhookEvent::Unknown => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_text_message() {
        let payload = WebhookPayload::parse(
            br#"{"events":[{"type":"message","message":{"type":"text","text":"hello"},"replyToken":"tok-1"}]}"#,
        )
        .unwrap();
        assert_eq!(
            payload.text_messages(),
            vec![TextMessageEvent {
                reply_token: "tok-1".to_string(),
                text: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn parses_full_platform_payload() {
        let body = br#"{
            "destination": "Uxxxxxxxx",
            "events": [
                {
                    "type": "message",
                    "mode": "active",
                    "timestamp": 1462629479859,
                    "source": {"type": "user", "userId": "U4af4980629"},
                    "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
                    "deliveryContext": {"isRedelivery": false},
                    "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
                    "message": {"id": "444573844083572737", "type": "text", "text": "Hello, world!"}
                }
            ]
        }"#;
        let payload = WebhookPayload::parse(body).unwrap();
        assert_eq!(payload.destination.as_deref(), Some("Uxxxxxxxx"));
        let WebhookEvent::Message(ref event) = payload.events[0] else {
            panic!("expected message event");
        };
        assert_eq!(event.timestamp, Some(1462629479859));
        assert_eq!(
            event.source.as_ref().and_then(|s| s.user_id.as_deref()),
            Some("U4af4980629")
        );
        assert_eq!(payload.text_messages()[0].text, "Hello, world!");
    }

    #[test]
    fn ignores_unknown_events_and_non_text_messages() {
        let body = br#"{"events":[
            {"type":"follow","replyToken":"tok-f","source":{"type":"user","userId":"U1"}},
            {"type":"message","replyToken":"tok-s","message":{"type":"sticker","packageId":"1","stickerId":"1"}},
            {"type":"postback","replyToken":"tok-p","postback":{"data":"x"}},
            {"type":"message","replyToken":"tok-t","message":{"type":"text","text":"hi"}}
        ]}"#;
        let payload = WebhookPayload::parse(body).unwrap();
        assert_eq!(payload.events.len(), 4);
        assert!(matches!(payload.events[0], WebhookEvent::Unknown));
        let texts = payload.text_messages();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].reply_token, "tok-t");
    }

    #[test]
    fn empty_or_missing_events() {
        assert!(WebhookPayload::parse(br#"{"events":[]}"#)
            .unwrap()
            .text_messages()
            .is_empty());
        assert!(WebhookPayload::parse(br#"{"destination":"U1"}"#)
            .unwrap()
            .events
            .is_empty());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(WebhookPayload::parse(b"not json").is_err());
        assert!(WebhookPayload::parse(br#"{"events":{"type":"message"}}"#).is_err());
    }

    #[test]
    fn standby_event_without_token_does_not_drop_the_batch() {
        let body = br#"{"events":[
            {"type":"message","mode":"standby","message":{"type":"text","text":"ignored"}},
            {"type":"message","mode":"active","replyToken":"tok-2","message":{"type":"text","text":"hello"}}
        ]}"#;
        let payload = WebhookPayload::parse(body).unwrap();
        assert_eq!(payload.events.len(), 2);
        let WebhookEvent::Message(ref standby) = payload.events[0] else {
            panic!("expected message event");
        };
        assert_eq!(standby.reply_token, None);
        assert_eq!(standby.mode.as_deref(), Some("standby"));
        assert_eq!(
            payload.text_messages(),
            vec![TextMessageEvent {
                reply_token: "tok-2".to_string(),
                text: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn unreadable_event_becomes_unknown() {
        let body = br#"{"events":[
            {"type":"message","replyToken":"tok-x"},
            {"type":"message","replyToken":"tok-y","message":{"type":"text","text":42}},
            "not an object",
            {"type":"message","replyToken":"tok-z","message":{"type":"text","text":"ok"}}
        ]}"#;
        let payload = WebhookPayload::parse(body).unwrap();
        assert_eq!(payload.events.len(), 4);
        assert!(matches!(payload.events[0], WebhookEvent::Unknown));
        assert!(matches!(payload.events[1], WebhookEvent::Unknown));
        assert!(matches!(payload.events[2], WebhookEvent::Unknown));
        let texts = payload.text_messages();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].reply_token, "tok-z");
    }
}
