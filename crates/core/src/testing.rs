//! In-memory collaborators for unit tests.

use crate::conversation::UserStore;
use crate::directory::StockDirectory;
use crate::domain::conversation::{ConversationState, MessageWindow};
use crate::domain::stock::StockRecord;
use crate::error::{BotError, Result};
use crate::market::{MarketDataProvider, PriceQuote};
use crate::messaging::{MessageReceipt, MessagingDispatcher};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    SymbolExact(String),
    NameSubstring(String),
    NameOrSymbolSubstring(String),
}

#[derive(Default)]
pub struct MemoryDirectory {
    records: Vec<StockRecord>,
    calls: Mutex<Vec<DirectoryCall>>,
    failure: Mutex<Option<String>>,
}

impl MemoryDirectory {
    pub fn with_records<I, S, N>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        Self {
            records: records
                .into_iter()
                .map(|(s, n)| StockRecord::new(s, n))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn enter(&self, call: DirectoryCall) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().as_deref() {
            Some(message) => Err(anyhow::anyhow!(message.to_string())),
            None => Ok(()),
        }
    }

    fn filter(
        &self,
        limit: usize,
        pred: impl Fn(&StockRecord) -> bool,
    ) -> Vec<StockRecord> {
        self.records
            .iter()
            .filter(|r| pred(r))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl StockDirectory for MemoryDirectory {
    async fn find_by_symbol_exact(&self, symbol: &str) -> anyhow::Result<Option<StockRecord>> {
        self.enter(DirectoryCall::SymbolExact(symbol.to_string()))?;
        Ok(self
            .records
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
            .cloned())
    }

    async fn find_by_name_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>> {
        self.enter(DirectoryCall::NameSubstring(fragment.to_string()))?;
        let fragment = fragment.to_lowercase();
        Ok(self.filter(limit, |r| r.company_name.to_lowercase().contains(&fragment)))
    }

    async fn find_by_name_or_symbol_substring(
        &self,
        fragment: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<StockRecord>> {
        self.enter(DirectoryCall::NameOrSymbolSubstring(fragment.to_string()))?;
        let fragment = fragment.to_lowercase();
        Ok(self.filter(limit, |r| {
            r.symbol.to_lowercase().contains(&fragment)
                || r.company_name.to_lowercase().contains(&fragment)
        }))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, ConversationState>>,
    failure: Mutex<Option<String>>,
    skip_next_read: AtomicBool,
}

impl MemoryUserStore {
    pub fn get(&self, phone: &str) -> Option<ConversationState> {
        self.users.lock().unwrap().get(phone).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Next `get_by_phone` reports no user even if one is stored.
    pub fn miss_next_read(&self) {
        self.skip_next_read.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        match self.failure.lock().unwrap().as_deref() {
            Some(message) => Err(anyhow::anyhow!(message.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_phone(&self, phone: &str) -> anyhow::Result<Option<ConversationState>> {
        self.check()?;
        if self.skip_next_read.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.get(phone))
    }

    async fn insert(&self, state: &ConversationState) -> anyhow::Result<ConversationState> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        Ok(users
            .entry(state.phone_number.clone())
            .or_insert_with(|| state.clone())
            .clone())
    }

    async fn update_message_window(
        &self,
        phone: &str,
        window: &MessageWindow,
    ) -> anyhow::Result<()> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(phone)
            .ok_or_else(|| anyhow::anyhow!("no user for {phone}"))?;
        user.last_outbound = window.clone();
        Ok(())
    }

    async fn touch_last_message(&self, phone: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(phone)
            .ok_or_else(|| anyhow::anyhow!("no user for {phone}"))?;
        user.last_message_at = Some(at);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticMarketData {
    quotes: Mutex<HashMap<String, PriceQuote>>,
    requested: Mutex<Vec<String>>,
    failure: Mutex<Option<BotError>>,
}

impl StaticMarketData {
    pub fn insert(&self, quote: PriceQuote) {
        self.quotes
            .lock()
            .unwrap()
            .insert(quote.symbol.clone(), quote);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn fail_with(&self, err: BotError) {
        *self.failure.lock().unwrap() = Some(err);
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for StaticMarketData {
    fn provider_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_performance(&self, symbol: &str) -> Result<PriceQuote> {
        self.requested.lock().unwrap().push(symbol.to_string());
        if let Some(err) = self.failure.lock().unwrap().as_ref() {
            return Err(match err {
                BotError::SymbolNotFound(s) => BotError::SymbolNotFound(s.clone()),
                other => BotError::UpstreamUnavailable(other.to_string()),
            });
        }
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| BotError::SymbolNotFound(symbol.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Polls until at least `count` messages went out; panics after a second.
    pub async fn wait_for(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(1), async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {count} messages");
    }
}

#[async_trait::async_trait]
impl MessagingDispatcher for RecordingMessenger {
    async fn send(&self, recipient_phone: &str, text: &str) -> Result<MessageReceipt> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(BotError::Delivery(message));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((recipient_phone.to_string(), text.to_string()));
        Ok(MessageReceipt {
            sid: format!("SM{:04}", sent.len()),
            status: Some("queued".into()),
        })
    }
}
