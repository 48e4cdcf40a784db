//! fra-historical: `HistoricalRateView`, spec §2/§3/§4.2.3 — "weighted-average
//! rates, spread stats, volatility metrics (consumed only)".
//!
//! This component does not compute history itself (that's the funding &
//! history service, §6.2, an external collaborator). It is the core-side
//! facade `fra-portfolio` calls: it packages the raw `HistoricalRateFeed`
//! responses into the shapes the optimizer needs, and owns the
//! fallback-sentinel and spread-validity checks from spec §4.2.3.

use fra_adapters::error::CoreResult;
use fra_adapters::historical::{is_current_spread_fallback, HistoricalRateFeed, VolatilityMetrics};
use std::sync::Arc;

/// Spec §4.2.3 validation outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpreadValidity {
    Valid,
    /// `|historicalSpread| > 0.5`.
    ImplausiblyLarge,
    /// Historical spread equals the current spread within `1e-7` —
    /// indicates no matched history (the source's fallback sentinel).
    NoMatchedHistory,
}

impl SpreadValidity {
    pub fn is_valid(self) -> bool {
        matches!(self, SpreadValidity::Valid)
    }
}

pub struct HistoricalRateView<F: HistoricalRateFeed + ?Sized> {
    feed: Arc<F>,
}

impl<F: HistoricalRateFeed + ?Sized> HistoricalRateView<F> {
    pub fn new(feed: Arc<F>) -> Self {
        Self { feed }
    }

    pub async fn weighted_average_rate(
        &self,
        symbol: &str,
        venue: &str,
        current_rate: f64,
    ) -> CoreResult<f64> {
        self.feed
            .get_weighted_average_rate(symbol, venue, current_rate)
            .await
    }

    /// Resolves the base rates for an opportunity's long/short legs,
    /// falling back to current rates if the historical spread collapses to
    /// the current-spread sentinel (spec §4.2.1: "falls back to current
    /// rates if the historical view yields the current spread").
    pub async fn base_rates(
        &self,
        symbol: &str,
        long_venue: &str,
        short_venue: &str,
        current_long_rate: f64,
        current_short_rate: f64,
    ) -> CoreResult<(f64, f64, f64)> {
        let h_long = self
            .weighted_average_rate(symbol, long_venue, current_long_rate)
            .await?;
        let h_short = self
            .weighted_average_rate(symbol, short_venue, current_short_rate)
            .await?;
        let historical_spread = self
            .average_spread(symbol, long_venue, short_venue, current_long_rate, current_short_rate)
            .await?;
        let current_spread = (current_long_rate - current_short_rate).abs();
        if is_current_spread_fallback(historical_spread, current_spread) {
            Ok((current_long_rate, current_short_rate, current_spread))
        } else {
            Ok((h_long, h_short, historical_spread))
        }
    }

    pub async fn average_spread(
        &self,
        symbol: &str,
        long_venue: &str,
        short_venue: &str,
        current_long: f64,
        current_short: f64,
    ) -> CoreResult<f64> {
        self.feed
            .get_average_spread(symbol, long_venue, short_venue, current_long, current_short)
            .await
    }

    pub async fn volatility_metrics(
        &self,
        symbol: &str,
        long_venue: &str,
        short_venue: &str,
        days: u32,
    ) -> CoreResult<Option<VolatilityMetrics>> {
        self.feed
            .get_spread_volatility_metrics(symbol, long_venue, short_venue, days)
            .await
    }

    /// Sample-point count for a (symbol, venue), used by the data-quality
    /// risk factor (spec §4.2.2).
    pub async fn sample_count(&self, symbol: &str, venue: &str) -> CoreResult<usize> {
        Ok(self.feed.get_historical_data(symbol, venue).await?.len())
    }

    /// Spec §4.2.3: "Reject opportunity if `|historicalSpread| > 0.5`, or
    /// if historicalSpread equals current spread within `1e-7`".
    pub fn validate_spread(historical_spread: f64, current_spread: f64) -> SpreadValidity {
        if historical_spread.abs() > 0.5 {
            SpreadValidity::ImplausiblyLarge
        } else if is_current_spread_fallback(historical_spread, current_spread) {
            SpreadValidity::NoMatchedHistory
        } else {
            SpreadValidity::Valid
        }
    }
}
