use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod twilio;

pub use twilio::TwilioMessenger;

/// Channel scheme Twilio prefixes onto WhatsApp addresses.
pub const WHATSAPP_SCHEME: &str = "whatsapp:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// "Send text to recipient". Fails with `BotError::Delivery`; nothing is queued or retried.
#[async_trait::async_trait]
pub trait MessagingDispatcher: Send + Sync {
    async fn send(&self, recipient_phone: &str, text: &str) -> Result<MessageReceipt>;
}

pub fn strip_channel_scheme(address: &str) -> &str {
    let address = address.trim();
    address
        .strip_prefix(WHATSAPP_SCHEME)
        .map_or(address, str::trim)
}
