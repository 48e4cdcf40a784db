use crate::error::CoreResult;
use async_trait::async_trait;
use fra_schemas::opportunity::Opportunity;

/// Spec §3/§6.2 `getSpreadVolatilityMetrics` result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityMetrics {
    pub stability_score: f64,
    pub max_hourly_spread_change: f64,
    pub spread_reversals: u32,
    pub spread_drops_to_zero: u32,
}

/// A single historical funding-rate sample point (spec §6.2
/// `getHistoricalData`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalPoint {
    pub timestamp_unix_secs: i64,
    pub rate: f64,
}

/// Per-venue current funding rate (spec §6.2 `getFundingRates`).
#[derive(Debug, Clone, PartialEq)]
pub struct VenueFundingRate {
    pub venue: String,
    pub current_rate: f64,
}

/// Funding & history contract (spec §6.2) — external collaborator. This
/// crate defines the boundary only; discovery and storage live elsewhere.
#[async_trait]
pub trait HistoricalRateFeed: Send + Sync {
    async fn find_arbitrage_opportunities(
        &self,
        symbols: &[String],
        min_spread: f64,
    ) -> CoreResult<Vec<Opportunity>>;

    async fn get_funding_rates(&self, symbol: &str) -> CoreResult<Vec<VenueFundingRate>>;

    /// Venue-specific symbol rendering; the core passes the result through
    /// transparently (spec §6.2).
    async fn get_exchange_symbol(&self, symbol: &str, venue: &str) -> CoreResult<String>;

    async fn get_weighted_average_rate(
        &self,
        symbol: &str,
        venue: &str,
        current_rate: f64,
    ) -> CoreResult<f64>;

    /// Spec §6.2: `getAverageSpread(symbol, longVenue, symbol, shortVenue,
    /// currentLong, currentShort)`. The symbol is passed twice in the
    /// source signature (one per leg) — both legs always share a symbol in
    /// this core, so this binding collapses them to a single `symbol` arg.
    async fn get_average_spread(
        &self,
        symbol: &str,
        long_venue: &str,
        short_venue: &str,
        current_long: f64,
        current_short: f64,
    ) -> CoreResult<f64>;

    async fn get_spread_volatility_metrics(
        &self,
        symbol: &str,
        long_venue: &str,
        short_venue: &str,
        days: u32,
    ) -> CoreResult<Option<VolatilityMetrics>>;

    async fn get_historical_data(
        &self,
        symbol: &str,
        venue: &str,
    ) -> CoreResult<Vec<HistoricalPoint>>;
}

/// Exact-equality sentinel check from spec §4.2.3 / design notes: the
/// allocator's historical spread lookup signals "no matched history" by
/// returning the current spread unchanged. Detect that within `1e-7`.
pub fn is_current_spread_fallback(historical_spread: f64, current_spread: f64) -> bool {
    (historical_spread - current_spread).abs() < 1e-7
}
