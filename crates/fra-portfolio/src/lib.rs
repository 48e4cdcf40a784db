//! fra-portfolio: the `PortfolioOptimizer`, spec §4.2.
//!
//! Two stages: [`assess_opportunity`] finds each candidate's own
//! sustainable max notional (§4.2.1-4.2.3), then [`allocation::allocate`]
//! divides available capital across the accepted set (§4.2.4). Both
//! stages are pure given their inputs — the only I/O is the historical
//! feed lookups in `assess_opportunity`, routed through
//! `fra_historical::HistoricalRateView` exactly as the rest of the core
//! does.

mod allocation;
mod data_quality;
mod max_notional;
mod worst_case;

pub use allocation::{allocate, opportunity_key, Allocation, PortfolioAllocation};

use fra_adapters::error::CoreResult;
use fra_adapters::historical::{HistoricalRateFeed, VolatilityMetrics};
use fra_adapters::venue::BestBidAsk;
use fra_config::StrategyConfig;
use fra_historical::{HistoricalRateView, SpreadValidity};
use fra_schemas::opportunity::Opportunity;

/// Why an opportunity did not produce an [`OpportunityAssessment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectionReason {
    DataQuality(SpreadValidity),
    MissingOpenInterest,
    GrossApyBelowTarget { gross_apy: f64, target: f64 },
    NoViableNotional,
    /// The targeted search found nothing, and the OI-derived worst-case
    /// fallback (spec §9) would take longer than `maxWorstCaseBreakEvenDays`
    /// to break even.
    WorstCaseBreakEvenTooSlow { break_even_days: f64, cap_days: f64 },
}

#[derive(Debug, Clone)]
pub enum Assessment {
    Accepted(OpportunityAssessment),
    Rejected(RejectionReason),
}

impl Assessment {
    pub fn accepted(self) -> Option<OpportunityAssessment> {
        match self {
            Assessment::Accepted(a) => Some(a),
            Assessment::Rejected(_) => None,
        }
    }
}

/// A venue-adjacent opportunity that cleared §4.2.1-4.2.3, ready for
/// [`allocation::allocate`].
#[derive(Debug, Clone)]
pub struct OpportunityAssessment {
    pub opportunity: Opportunity,
    pub historical_long_rate: f64,
    pub historical_short_rate: f64,
    pub max_notional_usd: f64,
    pub data_quality_risk_factor: f64,
    pub volatility: Option<VolatilityMetrics>,
    long_best_bid_ask: BestBidAsk,
    short_best_bid_ask: BestBidAsk,
    long_fee_rate: f64,
    short_fee_rate: f64,
}

impl OpportunityAssessment {
    /// `netApy` this opportunity would realize if sized at `position_usd`,
    /// holding the calibrated historical rates and books fixed. Used by
    /// [`allocation::allocate`] to recompute yield at the actual (smaller
    /// than `maxNotionalUsd`) allocated size.
    pub fn net_apy_at(&self, position_usd: f64) -> f64 {
        max_notional::net_apy_and_break_even(
            position_usd,
            self.historical_long_rate,
            self.historical_short_rate,
            self.long_best_bid_ask,
            self.short_best_bid_ask,
            self.opportunity.long_open_interest_usd,
            self.opportunity.short_open_interest_usd,
            self.long_fee_rate,
            self.short_fee_rate,
        )
        .0
    }
}

/// Assess one candidate opportunity against the historical feed,
/// producing either a sized assessment or the reason it was dropped.
///
/// `*_sample_points`/`*_funding_interval_hours` feed the data-quality
/// factor (§4.2.2); the caller resolves these from
/// `HistoricalRateView::sample_count` and its own venue metadata before
/// calling in, since that lookup and this scoring are independently
/// useful (the orchestrator logs sample counts regardless of outcome).
#[allow(clippy::too_many_arguments)]
pub async fn assess_opportunity<F: HistoricalRateFeed + ?Sized>(
    opportunity: &Opportunity,
    long_best_bid_ask: BestBidAsk,
    short_best_bid_ask: BestBidAsk,
    long_fee_rate: f64,
    short_fee_rate: f64,
    long_sample_points: usize,
    short_sample_points: usize,
    long_funding_interval_hours: u8,
    short_funding_interval_hours: u8,
    history: &HistoricalRateView<F>,
    config: &StrategyConfig,
) -> CoreResult<Assessment> {
    let (historical_long_rate, historical_short_rate, historical_spread) = history
        .base_rates(
            &opportunity.symbol,
            &opportunity.long_venue,
            &opportunity.short_venue,
            opportunity.long_funding_rate,
            opportunity.short_funding_rate,
        )
        .await?;

    let validity = HistoricalRateView::<F>::validate_spread(historical_spread, opportunity.spread());
    if !validity.is_valid() {
        return Ok(Assessment::Rejected(RejectionReason::DataQuality(validity)));
    }

    let gross_apy = historical_spread.abs() * fra_schemas::PERIODS_PER_YEAR_HOURLY;
    if gross_apy <= config.target_net_apy {
        return Ok(Assessment::Rejected(RejectionReason::GrossApyBelowTarget {
            gross_apy,
            target: config.target_net_apy,
        }));
    }

    let (long_oi, short_oi) = match (opportunity.long_open_interest_usd, opportunity.short_open_interest_usd) {
        (Some(l), Some(s)) if l > 0.0 && s > 0.0 => (l, s),
        _ => return Ok(Assessment::Rejected(RejectionReason::MissingOpenInterest)),
    };

    let chosen_pos = match max_notional::search_max_notional(
        historical_long_rate,
        historical_short_rate,
        long_best_bid_ask,
        short_best_bid_ask,
        long_oi,
        short_oi,
        long_fee_rate,
        short_fee_rate,
        config.target_net_apy,
    ) {
        Some(pos) => pos,
        None => {
            let min_oi = long_oi.min(short_oi);
            if worst_case::is_degenerate(min_oi) {
                tracing::debug!(
                    min_oi,
                    "worst-case liquidity factor undefined/negative below $1k OI (spec §9 design note); clamped to 0"
                );
            }
            let candidate = worst_case::worst_case_notional(min_oi);
            if candidate < config.min_position_usd {
                return Ok(Assessment::Rejected(RejectionReason::NoViableNotional));
            }
            let (_, break_even_hours) = max_notional::net_apy_and_break_even(
                candidate,
                historical_long_rate,
                historical_short_rate,
                long_best_bid_ask,
                short_best_bid_ask,
                Some(long_oi),
                Some(short_oi),
                long_fee_rate,
                short_fee_rate,
            );
            let break_even_days = break_even_hours / 24.0;
            if !break_even_days.is_finite() || break_even_days > config.max_worst_case_break_even_days {
                return Ok(Assessment::Rejected(RejectionReason::WorstCaseBreakEvenTooSlow {
                    break_even_days,
                    cap_days: config.max_worst_case_break_even_days,
                }));
            }
            candidate
        }
    };

    let volatility = history
        .volatility_metrics(&opportunity.symbol, &opportunity.long_venue, &opportunity.short_venue, 30)
        .await?;
    let (_, break_even_hours) = max_notional::net_apy_and_break_even(
        chosen_pos,
        historical_long_rate,
        historical_short_rate,
        long_best_bid_ask,
        short_best_bid_ask,
        Some(long_oi),
        Some(short_oi),
        long_fee_rate,
        short_fee_rate,
    );
    let max_notional_usd = max_notional::apply_volatility_discount(chosen_pos, break_even_hours, volatility);

    let data_quality_risk_factor = data_quality::risk_factor(
        long_sample_points,
        short_sample_points,
        long_funding_interval_hours,
        short_funding_interval_hours,
    );

    Ok(Assessment::Accepted(OpportunityAssessment {
        opportunity: opportunity.clone(),
        historical_long_rate,
        historical_short_rate,
        max_notional_usd,
        data_quality_risk_factor,
        volatility,
        long_best_bid_ask,
        short_best_bid_ask,
        long_fee_rate,
        short_fee_rate,
    }))
}

/// Test-only `OpportunityAssessment` constructors for other crates' test
/// suites, gated behind the `testkit` feature (mirrors `fra-adapters`'s
/// `testkit` convention — never enabled in a production build).
/// `OpportunityAssessment`'s fields are otherwise crate-private, so a
/// downstream crate's tests (e.g. `fra-orchestrator::risk_report`'s) have
/// no other way to build one that exercises a specific `volatility` state.
#[cfg(any(test, feature = "testkit"))]
pub mod testkit {
    use super::*;
    use chrono::Utc;

    /// A fully-formed assessment for allocation-/report-stage tests,
    /// bypassing `assess_opportunity`'s async historical lookups.
    pub fn assessment_fixture(
        max_notional_usd: f64,
        data_quality_risk_factor: f64,
        volatility: Option<VolatilityMetrics>,
    ) -> OpportunityAssessment {
        OpportunityAssessment {
            opportunity: Opportunity {
                symbol: "BTC".into(),
                long_venue: "A".into(),
                short_venue: "B".into(),
                long_funding_rate: -1e-4,
                short_funding_rate: 5e-4,
                long_mark_price: 100.0,
                short_mark_price: 100.0,
                long_open_interest_usd: Some(1e7),
                short_open_interest_usd: Some(1e7),
                timestamp: Utc::now(),
            },
            historical_long_rate: -1e-4,
            historical_short_rate: 5e-4,
            max_notional_usd,
            data_quality_risk_factor,
            volatility,
            long_best_bid_ask: BestBidAsk { best_bid: 99.99, best_ask: 100.01 },
            short_best_bid_ask: BestBidAsk { best_bid: 99.99, best_ask: 100.01 },
            long_fee_rate: 1e-4,
            short_fee_rate: 1e-4,
        }
    }

    impl OpportunityAssessment {
        /// Gives fixtures distinct allocation keys in tests that build
        /// several at once.
        pub fn with_venue(mut self, i: u32) -> Self {
            self.opportunity.short_venue = format!("B{i}");
            self
        }
    }
}
