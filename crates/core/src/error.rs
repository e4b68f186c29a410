use thiserror::Error;

/// Failure kinds surfaced by the bot core. Each one short-circuits the handler that hit it.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("market data unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("symbol not found upstream: {0}")]
    SymbolNotFound(String),

    #[error("message delivery failed: {0}")]
    Delivery(String),

    #[error("malformed inbound payload: {0}")]
    MalformedPayload(String),
}

impl BotError {
    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        Self::Persistence(err.into())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
