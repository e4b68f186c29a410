use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use uuid::Uuid;

pub const WINDOW_CAPACITY: usize = 2;

/// Sliding window over the most recent outbound texts. Never holds more than two entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MessageWindow {
    messages: VecDeque<String>,
}

impl MessageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.messages.push_back(text.into());
        while self.messages.len() > WINDOW_CAPACITY {
            self.messages.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() == WINDOW_CAPACITY
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.messages.iter().cloned().collect()
    }
}

impl From<Vec<String>> for MessageWindow {
    /// Rows written by older code may hold more than two entries; keep the newest.
    fn from(messages: Vec<String>) -> Self {
        let mut window = Self::new();
        for m in messages {
            window.push(m);
        }
        window
    }
}

impl From<MessageWindow> for Vec<String> {
    fn from(window: MessageWindow) -> Self {
        window.messages.into_iter().collect()
    }
}

/// Per-user conversation record, keyed by the sender's phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_outbound: MessageWindow,
    pub is_subscribed: bool,
    pub subscribed_symbols: BTreeSet<String>,
}

impl ConversationState {
    pub fn new_for_phone(phone_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number: phone_number.into(),
            display_name: None,
            last_message_at: None,
            last_outbound: MessageWindow::new(),
            is_subscribed: true,
            subscribed_symbols: BTreeSet::new(),
        }
    }
}
