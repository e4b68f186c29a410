//! Outbound chat texts.

use crate::domain::stock::StockRecord;
use crate::market::PriceQuote;
use std::fmt::Write as _;

/// Compared verbatim against the message window; changing it resets everyone's retry budget.
pub const NOT_FOUND: &str = "❌ No results found.\n🔍 Try full company name or stock symbol.";

pub const GIVE_UP: &str = "🤷 We still couldn't find that stock in our listings.\n\
It may not be listed on NSE yet, or the name is spelled differently.\n\
🔁 Let's start over: send *Stock* followed by a symbol (e.g. *Stock TCS*) \
or the full company name (e.g. *Stock Tata Consultancy Services*).";

pub const TOP_STOCKS_PLACEHOLDER: &str =
    "⭐ *Top Stocks* is coming soon! Meanwhile, try *Stock HUL*.";

pub const FETCH_FAILED: &str =
    "⚠️ Failed to fetch the latest price right now. Please try again in a few minutes.";

pub const ALERT_UNDER_CONSTRUCTION: &str = "🚧 Currently under construction.";

pub fn welcome() -> &'static str {
    "👋🏻 Welcome to *Stocks Info Channel*!\n\
\n\
Send one of these:\n\
• 🔍 *Stock HUL* - HUL stock price and performance\n\
• 📢 *Alert Reliance Industries* - same report, by company name\n\
• 💹 *Prices NIFTY TCS INFY* - quick prices, one message each\n\
• ⭐ *Top Stocks* - today's trending stocks\n\
\n\
Made with ❤️ in 🇮🇳"
}

pub fn disambiguation(candidates: &[StockRecord]) -> String {
    let mut out = String::from("🤔 Found multiple results. Did you mean one of these?\n\n");
    for c in candidates {
        let _ = writeln!(out, "🔹 *{}* ({})", c.company_name, c.symbol);
    }
    out.push_str("\n💡 Reply with the exact symbol, e.g. *Stock ");
    out.push_str(candidates.first().map_or("HUL", |c| c.symbol.as_str()));
    out.push('*');
    out
}

pub fn price_alert(symbol: &str, quote: &PriceQuote) -> String {
    format!(
        "🔔 Alert: *{}*\nCurrent Price: ₹{:.2}",
        symbol.to_uppercase(),
        quote.current_price
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguation_lists_every_candidate() {
        let text = disambiguation(&[
            StockRecord::new("RELIANCE", "Reliance Industries Limited"),
            StockRecord::new("RELINFRA", "Reliance Infrastructure Limited"),
        ]);
        assert!(text.contains("🔹 *Reliance Industries Limited* (RELIANCE)\n"));
        assert!(text.contains("🔹 *Reliance Infrastructure Limited* (RELINFRA)\n"));
        assert!(text.ends_with("*Stock RELIANCE*"));
    }

    #[test]
    fn price_alert_uppercases_symbol() {
        let quote = PriceQuote {
            symbol: "TCS.NS".into(),
            current_price: 3999.456,
            open_price: 3900.0,
            price_1m: None,
            price_1y: None,
            price_5y: None,
        };
        assert_eq!(
            price_alert("tcs", &quote),
            "🔔 Alert: *TCS*\nCurrent Price: ₹3999.46"
        );
    }

    #[test]
    fn escalation_differs_from_not_found() {
        assert_ne!(GIVE_UP, NOT_FOUND);
    }
}
