use chrono::{DateTime, Utc};

/// A single (symbol, longVenue, shortVenue) candidate, spec §3.
///
/// `symbol` is normalized and venue-agnostic — callers are responsible for
/// rendering it to each venue's own symbol spelling via
/// `HistoricalRateAndOpportunityFeed::exchange_symbol` (spec §6.2).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Opportunity {
    pub symbol: String,
    pub long_venue: String,
    pub short_venue: String,
    /// Per-period (hourly) decimal funding rate on the long venue.
    pub long_funding_rate: f64,
    /// Per-period (hourly) decimal funding rate on the short venue.
    pub short_funding_rate: f64,
    pub long_mark_price: f64,
    pub short_mark_price: f64,
    pub long_open_interest_usd: Option<f64>,
    pub short_open_interest_usd: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Opportunity {
    /// `spread = |longRate - shortRate|` (spec §3).
    pub fn spread(&self) -> f64 {
        (self.long_funding_rate - self.short_funding_rate).abs()
    }

    /// `expectedAPY = spread * periodsPerYear` (spec §3, GLOSSARY).
    pub fn expected_apy(&self) -> f64 {
        self.spread() * crate::PERIODS_PER_YEAR_HOURLY
    }

    /// Invariant check: `longVenue != shortVenue` (spec §3).
    pub fn is_valid(&self) -> bool {
        !self.long_venue.is_empty()
            && !self.short_venue.is_empty()
            && self.long_venue != self.short_venue
            && !self.symbol.is_empty()
    }

    pub fn min_open_interest_usd(&self) -> Option<f64> {
        match (self.long_open_interest_usd, self.short_open_interest_usd) {
            (Some(l), Some(s)) => Some(l.min(s)),
            _ => None,
        }
    }
}
