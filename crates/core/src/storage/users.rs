use crate::conversation::UserStore;
use crate::domain::conversation::{ConversationState, MessageWindow};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

type UserRow = (
    Uuid,
    String,
    Option<String>,
    Option<DateTime<Utc>>,
    Vec<String>,
    bool,
    Vec<String>,
);

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: sqlx::PgPool,
}

impl PgUserStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn into_state(row: UserRow) -> ConversationState {
    let (id, phone_number, display_name, last_message_at, window, is_subscribed, symbols) = row;
    ConversationState {
        id,
        phone_number,
        display_name,
        last_message_at,
        last_outbound: MessageWindow::from(window),
        is_subscribed,
        subscribed_symbols: symbols.into_iter().collect(),
    }
}

/// Per-phone updates must hit exactly one row; zero means the user was never created.
fn expect_single_row(affected: u64, op: &str, phone: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        affected == 1,
        "{op} matched {affected} rows (phone={phone})"
    );
    Ok(())
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn get_by_phone(&self, phone: &str) -> anyhow::Result<Option<ConversationState>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, phone_number, name, last_message_time, \
                    last_two_messages_to_user, is_subscribed, subscribed_stocks \
             FROM users \
             WHERE phone_number = $1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("select user failed (phone={phone})"))?;

        Ok(row.map(into_state))
    }

    async fn insert(&self, state: &ConversationState) -> anyhow::Result<ConversationState> {
        let subscribed: Vec<String> = state.subscribed_symbols.iter().cloned().collect();
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, phone_number, name, last_message_time, \
                                last_two_messages_to_user, is_subscribed, subscribed_stocks) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (phone_number) DO NOTHING \
             RETURNING id, phone_number, name, last_message_time, \
                       last_two_messages_to_user, is_subscribed, subscribed_stocks",
        )
        .bind(state.id)
        .bind(&state.phone_number)
        .bind(&state.display_name)
        .bind(state.last_message_at)
        .bind(state.last_outbound.to_vec())
        .bind(state.is_subscribed)
        .bind(subscribed)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("insert user failed (phone={})", state.phone_number))?;

        if let Some(row) = row {
            return Ok(into_state(row));
        }

        // Another handler created this phone between our read and insert.
        tracing::debug!(phone = %state.phone_number, "user insert conflicted; loading existing row");
        self.get_by_phone(&state.phone_number)
            .await?
            .with_context(|| {
                format!(
                    "user missing after insert conflict (phone={})",
                    state.phone_number
                )
            })
    }

    async fn update_message_window(
        &self,
        phone: &str,
        window: &MessageWindow,
    ) -> anyhow::Result<()> {
        let res = sqlx::query(
            "UPDATE users SET last_two_messages_to_user = $1 WHERE phone_number = $2",
        )
        .bind(window.to_vec())
        .bind(phone)
        .execute(&self.pool)
        .await
        .with_context(|| format!("update message window failed (phone={phone})"))?;

        expect_single_row(res.rows_affected(), "update message window", phone)
    }

    async fn touch_last_message(&self, phone: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        let res = sqlx::query("UPDATE users SET last_message_time = $1 WHERE phone_number = $2")
            .bind(at)
            .bind(phone)
            .execute(&self.pool)
            .await
            .with_context(|| format!("update last_message_time failed (phone={phone})"))?;

        expect_single_row(res.rows_affected(), "update last_message_time", phone)
    }
}
