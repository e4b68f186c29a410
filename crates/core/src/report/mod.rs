use crate::domain::performance::{
    DailyTrend, GrowthBand, GrowthDirection, GrowthEntry, PerformanceSnapshot, Period,
};
use crate::domain::stock::StockRecord;
use crate::market::PriceQuote;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const TIMESTAMP_FORMAT: &str = "%d %b %Y %H:%M";

/// Growth statistics for `record` from a raw price quote. Periods whose historical price is
/// missing or zero are left out of the result.
pub fn build_report(
    record: &StockRecord,
    quote: &PriceQuote,
    as_of: DateTime<Utc>,
) -> PerformanceSnapshot {
    let mut growth_entries = BTreeMap::new();
    for period in Period::ALL {
        let Some(from) = quote.historical(period) else {
            continue;
        };
        if let Some(entry) = GrowthEntry::between(from, quote.current_price) {
            growth_entries.insert(period, entry);
        }
    }

    PerformanceSnapshot {
        symbol: record.symbol.clone(),
        company_name: record.company_name.clone(),
        current_price: quote.current_price,
        open_price: quote.open_price,
        timestamp: as_of,
        growth_entries,
    }
}

pub fn format_report(snapshot: &PerformanceSnapshot) -> String {
    let trend = snapshot.daily_trend();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} *{}* ({}) Stock Update",
        trend_emoji(trend),
        snapshot.company_name,
        snapshot.symbol.to_uppercase()
    );
    let _ = writeln!(out, "💰 *Current Price*: ₹{:.2}", snapshot.current_price);
    let _ = writeln!(
        out,
        "📅 *Today*: {} ₹{:.2} from open ₹{:.2}",
        trend.label(),
        (snapshot.current_price - snapshot.open_price).abs(),
        snapshot.open_price
    );
    let _ = writeln!(
        out,
        "🕒 *As of*: {}\n",
        snapshot.timestamp.format(TIMESTAMP_FORMAT)
    );

    out.push_str("📈 *Performance Overview:*\n");
    if snapshot.growth_entries.is_empty() {
        out.push_str("No historical prices available yet.\n");
    }
    for (period, entry) in &snapshot.growth_entries {
        let direction = entry.direction();
        let band = entry.band();
        let _ = writeln!(
            out,
            "{} *{}*: {:.2}% {} (₹{:.2} → ₹{:.2}) {} {}",
            direction_emoji(direction),
            period,
            entry.growth_percent,
            direction.label(),
            entry.from_price,
            entry.to_price,
            band_emoji(band),
            capitalize(band.label()),
        );
    }

    out.push_str("\n📬 _This is an automated stock alert. Stay informed!_");
    out
}

fn trend_emoji(trend: DailyTrend) -> &'static str {
    match trend {
        DailyTrend::Up => "🟢",
        DailyTrend::Down => "🔴",
        DailyTrend::Flat => "⚪",
    }
}

fn direction_emoji(direction: GrowthDirection) -> &'static str {
    match direction {
        GrowthDirection::Gain => "📈",
        GrowthDirection::Loss => "📉",
        GrowthDirection::NoChange => "⚖️",
    }
}

fn band_emoji(band: GrowthBand) -> &'static str {
    match band {
        GrowthBand::MassiveRally => "🚀",
        GrowthBand::Strong => "🔥",
        GrowthBand::DecentGrowth => "👍",
        GrowthBand::MildUptick => "📊",
        GrowthBand::NoChange => "➖",
        GrowthBand::SlightDip => "🔻",
        GrowthBand::WeakTrend => "⚠️",
        GrowthBand::MajorDecline => "💥",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
