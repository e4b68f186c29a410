pub mod bot;
pub mod conversation;
pub mod directory;
pub mod domain;
pub mod error;
pub mod market;
pub mod messaging;
pub mod replies;
pub mod report;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::BotError;

pub mod config {
    use anyhow::Context;

    const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
    const DEFAULT_SYMBOL_SUFFIX: &str = ".NS";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_PORT: u16 = 8080;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub twilio_account_sid: Option<String>,
        pub twilio_auth_token: Option<String>,
        pub twilio_base_url: String,
        pub phone_number: Option<String>,
        pub stock_price_url: Option<String>,
        pub market_symbol_suffix: String,
        pub http_timeout_secs: u64,
        pub port: u16,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                database_url: None,
                sentry_dsn: None,
                twilio_account_sid: None,
                twilio_auth_token: None,
                twilio_base_url: DEFAULT_TWILIO_BASE_URL.to_string(),
                phone_number: None,
                stock_price_url: None,
                market_symbol_suffix: DEFAULT_SYMBOL_SUFFIX.to_string(),
                http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                port: DEFAULT_PORT,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
                twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
                twilio_base_url: std::env::var("TWILIO_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(defaults.twilio_base_url),
                phone_number: std::env::var("PHONE_NUMBER").ok(),
                stock_price_url: std::env::var("STOCK_PRICE_URL").ok(),
                // An empty suffix is meaningful (symbols already carry the exchange).
                market_symbol_suffix: std::env::var("MARKET_SYMBOL_SUFFIX")
                    .unwrap_or(defaults.market_symbol_suffix),
                http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS")?
                    .unwrap_or(defaults.http_timeout_secs),
                port: parse_env("PORT")?.unwrap_or(defaults.port),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_twilio_account_sid(&self) -> anyhow::Result<&str> {
            self.twilio_account_sid
                .as_deref()
                .context("TWILIO_ACCOUNT_SID is required")
        }

        pub fn require_twilio_auth_token(&self) -> anyhow::Result<&str> {
            self.twilio_auth_token
                .as_deref()
                .context("TWILIO_AUTH_TOKEN is required")
        }

        pub fn require_phone_number(&self) -> anyhow::Result<&str> {
            self.phone_number
                .as_deref()
                .context("PHONE_NUMBER is required")
        }

        pub fn require_stock_price_url(&self) -> anyhow::Result<&str> {
            self.stock_price_url
                .as_deref()
                .context("STOCK_PRICE_URL is required")
        }
    }

    fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(key) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{key} is not valid: {raw}")),
            _ => Ok(None),
        }
    }
}
