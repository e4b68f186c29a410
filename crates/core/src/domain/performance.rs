use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Look-back window for a growth figure. Variant order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::OneMonth, Period::OneYear, Period::FiveYears];

    pub fn label(self) -> &'static str {
        match self {
            Period::OneMonth => "1M",
            Period::OneYear => "1Y",
            Period::FiveYears => "5Y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthEntry {
    pub from_price: f64,
    pub to_price: f64,
    pub growth_percent: f64,
}

impl GrowthEntry {
    /// `None` when `from_price` is zero or not a finite number, so callers never see NaN/inf.
    pub fn between(from_price: f64, to_price: f64) -> Option<Self> {
        if from_price == 0.0 || !from_price.is_finite() {
            return None;
        }
        Some(Self {
            from_price,
            to_price,
            // 100 -> 110 must come out as exactly 10.0.
            growth_percent: (to_price - from_price) * 100.0 / from_price,
        })
    }

    pub fn band(&self) -> GrowthBand {
        GrowthBand::classify(self.growth_percent)
    }

    pub fn direction(&self) -> GrowthDirection {
        GrowthDirection::classify(self.growth_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub open_price: f64,
    pub timestamp: DateTime<Utc>,
    pub growth_entries: BTreeMap<Period, GrowthEntry>,
}

impl PerformanceSnapshot {
    pub fn daily_trend(&self) -> DailyTrend {
        DailyTrend::from_prices(self.current_price, self.open_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyTrend {
    Up,
    Down,
    Flat,
}

impl DailyTrend {
    pub fn from_prices(current: f64, open: f64) -> Self {
        let delta = current - open;
        if delta > 0.0 {
            DailyTrend::Up
        } else if delta < 0.0 {
            DailyTrend::Down
        } else {
            DailyTrend::Flat
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DailyTrend::Up => "up",
            DailyTrend::Down => "down",
            DailyTrend::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthDirection {
    Gain,
    Loss,
    NoChange,
}

impl GrowthDirection {
    pub fn classify(growth: f64) -> Self {
        if growth < 0.0 {
            GrowthDirection::Loss
        } else if growth == 0.0 {
            GrowthDirection::NoChange
        } else {
            GrowthDirection::Gain
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GrowthDirection::Gain => "gain",
            GrowthDirection::Loss => "loss",
            GrowthDirection::NoChange => "no change",
        }
    }
}

/// Qualitative bucket for a growth percentage. Lower bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthBand {
    MassiveRally,
    Strong,
    DecentGrowth,
    MildUptick,
    NoChange,
    SlightDip,
    WeakTrend,
    MajorDecline,
}

impl GrowthBand {
    pub fn classify(growth: f64) -> Self {
        match growth {
            g if g == 0.0 => GrowthBand::NoChange,
            g if g > 100.0 => GrowthBand::MassiveRally,
            g if g > 50.0 => GrowthBand::Strong,
            g if g > 10.0 => GrowthBand::DecentGrowth,
            g if g > 0.0 => GrowthBand::MildUptick,
            g if g > -10.0 => GrowthBand::SlightDip,
            g if g > -50.0 => GrowthBand::WeakTrend,
            // Also catches NaN, which compares false everywhere above.
            _ => GrowthBand::MajorDecline,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GrowthBand::MassiveRally => "massive rally",
            GrowthBand::Strong => "strong",
            GrowthBand::DecentGrowth => "decent growth",
            GrowthBand::MildUptick => "mild uptick",
            GrowthBand::NoChange => "no change",
            GrowthBand::SlightDip => "slight dip",
            GrowthBand::WeakTrend => "weak trend",
            GrowthBand::MajorDecline => "major decline",
        }
    }
}
