//! Messaging channel: LINE webhook payloads, signature verification and the reply API.

mod inbound;
mod line;
mod reply;
mod signature;

pub use inbound::{
    EventSource, MessageContent, MessageEvent, TextMessageEvent, WebhookEvent, WebhookPayload,
};
pub use line::LineChannel;
pub use reply::{ChannelError, ReplyChannel};
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
