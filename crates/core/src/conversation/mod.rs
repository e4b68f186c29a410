//! Per-user conversation state: who we are talking to and what we last told them.

use crate::domain::conversation::{ConversationState, MessageWindow};
use crate::error::{BotError, Result};
use crate::replies;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_phone(&self, phone: &str) -> anyhow::Result<Option<ConversationState>>;

    /// Creates the user unless the phone already exists. Returns the stored row either way.
    async fn insert(&self, state: &ConversationState) -> anyhow::Result<ConversationState>;

    async fn update_message_window(
        &self,
        phone: &str,
        window: &MessageWindow,
    ) -> anyhow::Result<()>;

    async fn touch_last_message(&self, phone: &str, at: DateTime<Utc>) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ConversationTracker {
    store: Arc<dyn UserStore>,
}

impl ConversationTracker {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Single entry point for every inbound message: loads the user (creating it on first
    /// contact) and stamps the time of this message.
    pub async fn get_or_create(&self, phone: &str) -> Result<ConversationState> {
        let now = Utc::now();
        let existing = self
            .store
            .get_by_phone(phone)
            .await
            .map_err(BotError::Persistence)?;

        match existing {
            Some(mut state) => {
                self.store
                    .touch_last_message(phone, now)
                    .await
                    .map_err(BotError::Persistence)?;
                state.last_message_at = Some(now);
                Ok(state)
            }
            None => {
                tracing::info!(%phone, "first message from phone; creating user");
                let mut state = ConversationState::new_for_phone(phone);
                state.last_message_at = Some(now);
                let mut stored = self
                    .store
                    .insert(&state)
                    .await
                    .map_err(BotError::Persistence)?;

                if stored.id != state.id {
                    tracing::info!(%phone, "user created concurrently; using existing row");
                    self.store
                        .touch_last_message(phone, now)
                        .await
                        .map_err(BotError::Persistence)?;
                    stored.last_message_at = Some(now);
                }
                Ok(stored)
            }
        }
    }

    /// Read-modify-write of the stored window with no concurrency check: two messages from the
    /// same phone handled at once can overwrite each other's update.
    pub async fn record_outbound_message(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> Result<()> {
        state.last_outbound.push(text);
        self.persist_window(state).await
    }

    pub fn has_repeated_not_found(&self, state: &ConversationState) -> bool {
        state.last_outbound.is_full()
            && state
                .last_outbound
                .iter()
                .all(|m| m == replies::NOT_FOUND)
    }

    pub async fn reset_window(&self, state: &mut ConversationState) -> Result<()> {
        state.last_outbound.clear();
        self.persist_window(state).await
    }

    async fn persist_window(&self, state: &ConversationState) -> Result<()> {
        self.store
            .update_message_window(&state.phone_number, &state.last_outbound)
            .await
            .map_err(BotError::Persistence)?;
        tracing::debug!(
            phone = %state.phone_number,
            window_len = state.last_outbound.len(),
            "updated outbound message window"
        );
        Ok(())
    }
}
