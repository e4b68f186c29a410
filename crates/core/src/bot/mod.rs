pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, InboundMessage};

/// Upper bound on symbols accepted by one `prices` message.
pub const MAX_FAN_OUT_SYMBOLS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `stock <query>`
    StockQuery(String),
    /// `alert <query>`, resolved exactly like `stock`.
    Alert(String),
    /// `prices <SYM> <SYM> ...`, one independent price message per raw symbol.
    PriceFanOut(Vec<String>),
    TopStocks,
    Unknown,
}

impl Intent {
    pub fn parse(body: &str) -> Self {
        let text = body.trim().to_lowercase();

        if let Some(query) = strip_command(&text, "stock") {
            return Intent::StockQuery(query.to_string());
        }
        if let Some(query) = strip_command(&text, "alert") {
            return Intent::Alert(query.to_string());
        }
        if let Some(rest) = strip_command(&text, "prices") {
            let mut symbols: Vec<String> = Vec::new();
            for token in rest.split_whitespace() {
                let token = token.to_string();
                if !symbols.contains(&token) {
                    symbols.push(token);
                }
            }
            symbols.truncate(MAX_FAN_OUT_SYMBOLS);
            return Intent::PriceFanOut(symbols);
        }
        if text == "top stocks" {
            return Intent::TopStocks;
        }
        Intent::Unknown
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Intent::StockQuery(_) => "stock",
            Intent::Alert(_) => "alert",
            Intent::PriceFanOut(_) => "prices",
            Intent::TopStocks => "top_stocks",
            Intent::Unknown => "welcome",
        }
    }
}

/// `"<command> <rest>"` with a non-empty rest, returned trimmed.
fn strip_command<'a>(text: &'a str, command: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(command)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}
