use crate::bot::Intent;
use crate::conversation::ConversationTracker;
use crate::directory::{Resolution, StockMatcher};
use crate::domain::conversation::ConversationState;
use crate::domain::stock::StockRecord;
use crate::error::Result;
use crate::market::MarketDataProvider;
use crate::messaging::{MessageReceipt, MessagingDispatcher};
use crate::replies;
use crate::report::{build_report, format_report};
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender phone with the channel scheme already stripped.
    pub phone: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub intent: &'static str,
    /// Receipt for the single reply sent inline. `None` for the price fan-out.
    pub receipt: Option<MessageReceipt>,
    /// Detached price-alert tasks started for this message.
    pub spawned_alerts: usize,
}

pub struct Dispatcher {
    matcher: StockMatcher,
    tracker: ConversationTracker,
    market: Arc<dyn MarketDataProvider>,
    messenger: Arc<dyn MessagingDispatcher>,
    symbol_suffix: String,
}

impl Dispatcher {
    pub fn new(
        matcher: StockMatcher,
        tracker: ConversationTracker,
        market: Arc<dyn MarketDataProvider>,
        messenger: Arc<dyn MessagingDispatcher>,
        symbol_suffix: impl Into<String>,
    ) -> Self {
        Self {
            matcher,
            tracker,
            market,
            messenger,
            symbol_suffix: symbol_suffix.into(),
        }
    }

    pub async fn handle(&self, message: InboundMessage) -> Result<DispatchOutcome> {
        let mut state = self.tracker.get_or_create(&message.phone).await?;
        let intent = Intent::parse(&message.body);
        tracing::info!(phone = %message.phone, intent = intent.kind(), "dispatching inbound message");

        let kind = intent.kind();
        let receipt = match intent {
            Intent::StockQuery(query) | Intent::Alert(query) => {
                self.answer_query(&mut state, &query).await?
            }
            Intent::PriceFanOut(symbols) => {
                let spawned = self.spawn_price_alerts(&message.phone, symbols);
                return Ok(DispatchOutcome {
                    intent: kind,
                    receipt: None,
                    spawned_alerts: spawned,
                });
            }
            Intent::TopStocks => self.reply(&mut state, replies::TOP_STOCKS_PLACEHOLDER).await?,
            Intent::Unknown => self.reply(&mut state, replies::welcome()).await?,
        };

        Ok(DispatchOutcome {
            intent: kind,
            receipt: Some(receipt),
            spawned_alerts: 0,
        })
    }

    async fn answer_query(
        &self,
        state: &mut ConversationState,
        query: &str,
    ) -> Result<MessageReceipt> {
        match self.matcher.resolve_one(query).await? {
            Resolution::NotFound => self.answer_not_found(state, query).await,
            Resolution::Resolved(record) => self.answer_report(state, &record).await,
            Resolution::Ambiguous(candidates) => {
                tracing::info!(%query, candidates = candidates.len(), "ambiguous stock query");
                self.reply(state, &replies::disambiguation(&candidates)).await
            }
        }
    }

    /// The not-found reply is recorded before the check, so the second consecutive miss sees
    /// `[NOT_FOUND, NOT_FOUND]` and escalates instead of repeating itself.
    async fn answer_not_found(
        &self,
        state: &mut ConversationState,
        query: &str,
    ) -> Result<MessageReceipt> {
        self.tracker
            .record_outbound_message(state, replies::NOT_FOUND)
            .await?;

        if self.tracker.has_repeated_not_found(state) {
            tracing::info!(%query, phone = %state.phone_number, "repeated miss; resetting retry budget");
            self.tracker.reset_window(state).await?;
            return self.send(state, replies::GIVE_UP).await;
        }

        tracing::info!(%query, "no stock found");
        self.send(state, replies::NOT_FOUND).await
    }

    async fn answer_report(
        &self,
        state: &mut ConversationState,
        record: &StockRecord,
    ) -> Result<MessageReceipt> {
        let market_symbol = format!("{}{}", record.symbol, self.symbol_suffix);
        let quote = match self.market.fetch_performance(&market_symbol).await {
            Ok(quote) => quote,
            Err(err) => {
                tracing::warn!(
                    symbol = %market_symbol,
                    provider = self.market.provider_name(),
                    error = %err,
                    "failed to fetch stock price"
                );
                self.reply(state, replies::FETCH_FAILED).await?;
                return Err(err);
            }
        };

        let snapshot = build_report(record, &quote, Utc::now());
        tracing::debug!(
            symbol = %snapshot.symbol,
            periods = snapshot.growth_entries.len(),
            trend = snapshot.daily_trend().label(),
            "built performance report"
        );
        self.reply(state, &format_report(&snapshot)).await
    }

    /// Records `text` in the window, then sends it. A failed window update aborts the send.
    async fn reply(&self, state: &mut ConversationState, text: &str) -> Result<MessageReceipt> {
        self.tracker.record_outbound_message(state, text).await?;
        self.send(state, text).await
    }

    async fn send(&self, state: &ConversationState, text: &str) -> Result<MessageReceipt> {
        self.messenger.send(&state.phone_number, text).await
    }

    /// One detached task per symbol; nothing is joined and no ordering holds between replies.
    /// These replies bypass the message window.
    fn spawn_price_alerts(&self, phone: &str, symbols: Vec<String>) -> usize {
        let spawned = symbols.len();
        for symbol in symbols {
            let market = Arc::clone(&self.market);
            let messenger = Arc::clone(&self.messenger);
            let phone = phone.to_string();
            let market_symbol = format!("{}{}", symbol.to_uppercase(), self.symbol_suffix);

            tokio::spawn(async move {
                let result = match market.fetch_performance(&market_symbol).await {
                    Ok(quote) => messenger
                        .send(&phone, &replies::price_alert(&symbol, &quote))
                        .await
                        .map(|_| ()),
                    Err(err) => Err(err),
                };
                if let Err(err) = result {
                    tracing::warn!(symbol = %market_symbol, %phone, error = %err, "price alert failed");
                }
            });
        }
        tracing::info!(%phone, spawned, "dispatched price alerts");
        spawned
    }
}
