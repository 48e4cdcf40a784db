//! fra-execution-plan: the `ExecutionPlanBuilder`, spec §4.3.
//!
//! Turns an opportunity plus live venue state into a concrete,
//! delta-neutral paired plan. Every rejection returns a typed
//! [`fra_adapters::error::CoreError`] variant rather than `None` — the
//! orchestrator needs the reason to decide what to log and whether to
//! try a different opportunity.

use chrono::{Timelike, Utc};
use fra_adapters::error::{CoreError, CoreResult};
use fra_adapters::venue::{BestBidAsk, VenueAdapter};
use fra_config::StrategyConfig;
use fra_schemas::opportunity::Opportunity;
use fra_schemas::order::{OrderRequest, OrderSide, TimeInForce};
use fra_schemas::plan::{CostBreakdown, ExecutionPlan};
use fra_schemas::profile::{LiquidityProfile, SlippageModelCoefficients};

/// Inputs to a single plan-build attempt. Both adapters are optional so
/// the caller can express "no adapter registered for this venue" without
/// a sentinel lookup failing elsewhere.
pub struct BuildRequest<'a> {
    pub opportunity: &'a Opportunity,
    pub long_adapter: Option<&'a dyn VenueAdapter>,
    pub short_adapter: Option<&'a dyn VenueAdapter>,
    /// Caller-supplied marks (e.g. from a shared price cache); used only
    /// when `> 0`, otherwise the adapter is queried (spec §4.3 step 2).
    pub override_long_mark: Option<f64>,
    pub override_short_mark: Option<f64>,
    pub max_position_usd: Option<f64>,
    pub config: &'a StrategyConfig,
    /// Calibrated depth/spread history for each leg (spec §3's
    /// LiquidityProfile), when the caller has one on hand. `None` keeps
    /// sizing and cost purely book-snapshot-driven, same as before these
    /// existed — this never makes a plan fail that would otherwise build.
    pub long_liquidity_profile: Option<&'a LiquidityProfile>,
    pub short_liquidity_profile: Option<&'a LiquidityProfile>,
    /// Calibrated slippage-vs-size fit for the symbol (spec §3's
    /// SlippageModelCoefficients is one model per symbol, shared by both
    /// legs). When present and actually fitted (`sample_size > 0`, i.e.
    /// not [`SlippageModelCoefficients::uncalibrated`]), it replaces the
    /// book-snapshot slippage estimate.
    pub slippage_coefficients: Option<&'a SlippageModelCoefficients>,
}

/// Build a concrete [`ExecutionPlan`] for `req.opportunity`, or the typed
/// reason it can't be built right now.
pub async fn build_plan(req: BuildRequest<'_>) -> CoreResult<ExecutionPlan> {
    let opportunity = req.opportunity;
    let config = req.config;

    let long_adapter = req.long_adapter.ok_or_else(|| CoreError::AdapterUnavailable {
        venue: opportunity.long_venue.as_str().into(),
    })?;
    let short_adapter = req.short_adapter.ok_or_else(|| CoreError::AdapterUnavailable {
        venue: opportunity.short_venue.as_str().into(),
    })?;

    let long_mark = resolve_mark(long_adapter, &opportunity.symbol, &opportunity.long_venue, req.override_long_mark).await?;
    let short_mark = resolve_mark(short_adapter, &opportunity.symbol, &opportunity.short_venue, req.override_short_mark).await?;

    let long_balance = long_adapter.get_balance().await?;
    let short_balance = short_adapter.get_balance().await?;
    let min_balance = long_balance.min(short_balance);
    let usable = min_balance * 0.9;
    let cap = req.max_position_usd.unwrap_or(f64::INFINITY);
    let mut notional = (usable * config.leverage).min(cap);
    if notional < config.min_position_usd {
        return Err(CoreError::InsufficientCapital { notional_usd: notional, min_usd: config.min_position_usd });
    }

    let avg_mark = (long_mark + short_mark) / 2.0;
    let mut base_size = notional / avg_mark;

    let (long_oi, short_oi) = match (opportunity.long_open_interest_usd, opportunity.short_open_interest_usd) {
        (Some(l), Some(s)) if l >= config.min_open_interest_usd && s >= config.min_open_interest_usd => (l, s),
        _ => {
            return Err(CoreError::InsufficientLiquidity {
                reason: format!("open interest below {:.0} on at least one leg", config.min_open_interest_usd),
            })
        }
    };
    let max_from_oi = long_oi.min(short_oi) * 0.05;
    if notional > max_from_oi {
        notional = max_from_oi;
        base_size = notional / avg_mark;
        if notional < config.min_position_usd {
            return Err(CoreError::InsufficientCapital { notional_usd: notional, min_usd: config.min_position_usd });
        }
    }

    // Calibrated depth (spec §3 LiquidityProfile) is a tighter, hour-of-day
    // aware estimate of what the book can actually absorb than the raw OI
    // gate above; when both legs have one, it can only shrink `notional`
    // further, never widen it past the OI/balance gates already passed.
    if let (Some(long_profile), Some(short_profile)) = (req.long_liquidity_profile, req.short_liquidity_profile) {
        let hour = Utc::now().hour() as u8;
        let max_from_liquidity = long_profile.ask_depth_at(hour).min(short_profile.bid_depth_at(hour)) * 0.1;
        if notional > max_from_liquidity {
            notional = max_from_liquidity;
            base_size = notional / avg_mark;
            if notional < config.min_position_usd {
                return Err(CoreError::InsufficientCapital { notional_usd: notional, min_usd: config.min_position_usd });
            }
        }
    }

    let long_book = resolve_book(long_adapter, &opportunity.symbol, long_mark).await?;
    let short_book = resolve_book(short_adapter, &opportunity.symbol, short_mark).await?;

    let entry_fees = notional * (config.maker_fee_rate(&opportunity.long_venue) + config.maker_fee_rate(&opportunity.short_venue));
    let exit_fees = entry_fees;
    let slippage = 2.0 * (leg_slippage_usd(notional, &long_book, long_oi, req.long_liquidity_profile, req.slippage_coefficients)
        + leg_slippage_usd(notional, &short_book, short_oi, req.short_liquidity_profile, req.slippage_coefficients));
    let estimated_costs = CostBreakdown { entry_fees, exit_fees, slippage };

    let periods_per_year = fra_schemas::PERIODS_PER_YEAR_HOURLY;
    let hourly_return = (opportunity.expected_apy() / periods_per_year) * notional;
    if hourly_return <= 0.0 {
        return Err(CoreError::ProfitabilityFail { reason: "non-positive expected return at sized notional".into() });
    }
    let total_costs = estimated_costs.total();
    let break_even_hours = total_costs / hourly_return;
    let amortization_window = 24.0f64.min(break_even_hours.ceil().max(1.0));
    let amortized = total_costs / amortization_window;
    let net_per_period = hourly_return - amortized;
    if net_per_period <= 0.0 {
        return Err(CoreError::ProfitabilityFail { reason: "amortized costs exceed hourly return".into() });
    }

    let long_price = long_book.best_bid * (1.0 + 1e-4);
    let short_price = short_book.best_ask * (1.0 - 1e-4);
    let long_order = OrderRequest::limit(&opportunity.symbol, OrderSide::Buy, base_size, long_price, TimeInForce::Gtc, false)
        .map_err(|detail| CoreError::VenueError { venue: opportunity.long_venue.as_str().into(), detail })?;
    let short_order = OrderRequest::limit(&opportunity.symbol, OrderSide::Sell, base_size, short_price, TimeInForce::Gtc, false)
        .map_err(|detail| CoreError::VenueError { venue: opportunity.short_venue.as_str().into(), detail })?;

    Ok(ExecutionPlan {
        opportunity: opportunity.clone(),
        long_order,
        short_order,
        base_asset_size: base_size,
        estimated_costs,
        expected_net_return_per_period: net_per_period,
        timestamp: Utc::now(),
    })
}

async fn resolve_mark(
    adapter: &dyn VenueAdapter,
    symbol: &str,
    venue: &str,
    override_mark: Option<f64>,
) -> CoreResult<f64> {
    if let Some(m) = override_mark {
        if m > 0.0 {
            return Ok(m);
        }
    }
    let mark = adapter.get_mark_price(symbol).await?;
    if mark > 0.0 {
        Ok(mark)
    } else {
        Err(CoreError::VenueError { venue: venue.into(), detail: "mark price unavailable".into() })
    }
}

async fn resolve_book(adapter: &dyn VenueAdapter, symbol: &str, mark: f64) -> CoreResult<BestBidAsk> {
    match adapter.get_best_bid_ask(symbol).await? {
        Some(book) => Ok(book),
        None => Ok(BestBidAsk::synthesize_from_mark(mark)),
    }
}

/// One leg's estimated slippage cost, in USD. Prefers the calibrated
/// model (spec §3 SlippageModelCoefficients, fed the calibrated depth/
/// spread at the current hour-of-day from a LiquidityProfile) over the
/// book-snapshot heuristic in [`fra_costing::slippage`] — but only when
/// both calibrated inputs are on hand and the model is actually fitted
/// (not [`SlippageModelCoefficients::uncalibrated`]); otherwise falls
/// back unchanged.
fn leg_slippage_usd(
    notional: f64,
    book: &BestBidAsk,
    open_interest_usd: f64,
    liquidity_profile: Option<&LiquidityProfile>,
    slippage_coefficients: Option<&SlippageModelCoefficients>,
) -> f64 {
    if let (Some(profile), Some(coeffs)) = (liquidity_profile, slippage_coefficients.filter(|c| c.sample_size > 0)) {
        let hour = Utc::now().hour() as u8;
        let depth = profile.bid_depth_at(hour).min(profile.ask_depth_at(hour));
        if depth > 0.0 {
            let spread_bps = profile.spread_bps_at(hour);
            return notional.max(0.0) * coeffs.predict_bps(notional, depth, spread_bps) / 10_000.0;
        }
    }
    fra_costing::slippage(notional, book.best_bid, book.best_ask, Some(open_interest_usd), fra_schemas::order::OrderType::Limit)
}

/// Which side of a pair is harder to fill without moving the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Long,
    Short,
}

/// Ranks the two legs of a pair by how much caution their placement
/// deserves: lower `confidence_score`, then shallower `effective_bid_depth`,
/// is "harder". A non-concurrent placement mode can use this to submit
/// the harder leg first and avoid discovering a thin market only after
/// the easy leg is already filled. The concurrent fork-join placement
/// `fra-executor::place_pair` uses by default doesn't consult this — it's
/// a hook for a future sequential mode, not a change to the default path.
pub fn harder_leg(long_profile: &fra_schemas::profile::LiquidityProfile, short_profile: &fra_schemas::profile::LiquidityProfile) -> Leg {
    if long_profile.confidence_score != short_profile.confidence_score {
        return if long_profile.confidence_score < short_profile.confidence_score { Leg::Long } else { Leg::Short };
    }
    if long_profile.effective_bid_depth <= short_profile.effective_bid_depth {
        Leg::Long
    } else {
        Leg::Short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fra_adapters::mock::MockVenueAdapter;
    use chrono::Utc as ChronoUtc;

    fn opportunity() -> Opportunity {
        Opportunity {
            symbol: "BTC".into(),
            long_venue: "A".into(),
            short_venue: "B".into(),
            long_funding_rate: -2e-4,
            short_funding_rate: 4e-4,
            long_mark_price: 50_000.0,
            short_mark_price: 50_000.0,
            long_open_interest_usd: Some(5e7),
            short_open_interest_usd: Some(5e7),
            timestamp: ChronoUtc::now(),
        }
    }

    #[tokio::test]
    async fn missing_adapter_fails() {
        let opp = opportunity();
        let config = StrategyConfig::default();
        let result = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: None,
            short_adapter: None,
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await;
        assert!(matches!(result, Err(CoreError::AdapterUnavailable { .. })));
    }

    #[tokio::test]
    async fn thin_balance_fails_insufficient_capital() {
        let long = MockVenueAdapter::new("A").with_balance(1.0).with_mark_price("BTC", 50_000.0);
        let short = MockVenueAdapter::new("B").with_balance(1.0).with_mark_price("BTC", 50_000.0);
        let opp = opportunity();
        let config = StrategyConfig::default();
        let result = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await;
        assert!(matches!(result, Err(CoreError::InsufficientCapital { .. })));
    }

    #[tokio::test]
    async fn thin_open_interest_fails_insufficient_liquidity() {
        let long = MockVenueAdapter::new("A").with_balance(100_000.0).with_mark_price("BTC", 50_000.0);
        let short = MockVenueAdapter::new("B").with_balance(100_000.0).with_mark_price("BTC", 50_000.0);
        let mut opp = opportunity();
        opp.long_open_interest_usd = Some(100.0);
        let config = StrategyConfig::default();
        let result = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await;
        assert!(matches!(result, Err(CoreError::InsufficientLiquidity { .. })));
    }

    #[tokio::test]
    async fn builds_a_delta_neutral_plan_when_well_formed() {
        let long = MockVenueAdapter::new("A")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let short = MockVenueAdapter::new("B")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let mut opp = opportunity();
        opp.long_funding_rate = -2.5e-3;
        opp.short_funding_rate = 2.5e-3;
        let config = StrategyConfig::default();
        let plan = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await
        .expect("plan should build");
        assert!(plan.is_delta_neutral());
        assert!(plan.expected_net_return_per_period > 0.0);
        assert_eq!(plan.long_order.side, OrderSide::Buy);
        assert_eq!(plan.short_order.side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn unprofitable_spread_fails_profitability_gate() {
        let long = MockVenueAdapter::new("A")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let short = MockVenueAdapter::new("B")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let mut opp = opportunity();
        opp.long_funding_rate = -1e-7;
        opp.short_funding_rate = 1e-7;
        let config = StrategyConfig::default();
        let result = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await;
        assert!(matches!(result, Err(CoreError::ProfitabilityFail { .. })));
    }

    fn profile(confidence_score: f64, effective_bid_depth: f64) -> fra_schemas::profile::LiquidityProfile {
        fra_schemas::profile::LiquidityProfile {
            symbol: "BTC".into(),
            venue: "A".into(),
            effective_bid_depth,
            effective_ask_depth: effective_bid_depth,
            avg_spread_bps: 5.0,
            hourly_depth_multipliers: [1.0; 24],
            hourly_spread_multipliers: [1.0; 24],
            confidence_score,
            sample_count: 100,
            calibration_time: ChronoUtc::now(),
        }
    }

    #[test]
    fn harder_leg_prefers_lower_confidence() {
        assert_eq!(harder_leg(&profile(0.2, 1_000_000.0), &profile(0.9, 100.0)), Leg::Long);
    }

    #[test]
    fn harder_leg_falls_back_to_shallower_depth_on_a_confidence_tie() {
        assert_eq!(harder_leg(&profile(0.5, 100.0), &profile(0.5, 1_000.0)), Leg::Long);
        assert_eq!(harder_leg(&profile(0.5, 1_000.0), &profile(0.5, 100.0)), Leg::Short);
    }

    #[tokio::test]
    async fn thin_liquidity_profile_caps_notional_tighter_than_the_oi_gate() {
        let long = MockVenueAdapter::new("A")
            .with_balance(10_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let short = MockVenueAdapter::new("B")
            .with_balance(10_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let mut opp = opportunity();
        opp.long_funding_rate = -2.5e-3;
        opp.short_funding_rate = 2.5e-3;
        let config = StrategyConfig::default();
        let thin = profile(0.8, 50_000.0);
        let plan = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: Some(&thin),
            short_liquidity_profile: Some(&thin),
            slippage_coefficients: None,
        })
        .await
        .expect("plan should still build, just shrunk to the calibrated depth");
        let notional = plan.base_asset_size * opp.long_mark_price;
        assert!(notional <= 5_000.0 + 1e-6, "expected liquidity-capped notional <= 5000, got {notional}");
    }

    #[tokio::test]
    async fn calibrated_slippage_coefficients_replace_the_book_heuristic_when_supplied() {
        let long = MockVenueAdapter::new("A")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let short = MockVenueAdapter::new("B")
            .with_balance(1_000_000.0)
            .with_mark_price("BTC", 50_000.0)
            .with_best_bid_ask("BTC", 49_990.0, 50_010.0);
        let mut opp = opportunity();
        opp.long_funding_rate = -2.5e-3;
        opp.short_funding_rate = 2.5e-3;
        let config = StrategyConfig::default();
        // Deep enough that the liquidity-depth cap never binds, so the
        // only difference between the two runs is which slippage estimate
        // is used, not a different sized notional.
        let deep = profile(0.9, 100_000_000.0);
        let coeffs = fra_schemas::profile::SlippageModelCoefficients {
            alpha: 1.0,
            beta: 0.0,
            gamma: 50.0,
            r_squared: 0.9,
            sample_size: 200,
            last_calibrated: ChronoUtc::now(),
        };

        let baseline = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: None,
            short_liquidity_profile: None,
            slippage_coefficients: None,
        })
        .await
        .expect("baseline plan should build");

        let calibrated = build_plan(BuildRequest {
            opportunity: &opp,
            long_adapter: Some(&long),
            short_adapter: Some(&short),
            override_long_mark: None,
            override_short_mark: None,
            max_position_usd: None,
            config: &config,
            long_liquidity_profile: Some(&deep),
            short_liquidity_profile: Some(&deep),
            slippage_coefficients: Some(&coeffs),
        })
        .await
        .expect("calibrated plan should build");

        assert!(
            calibrated.estimated_costs.slippage > baseline.estimated_costs.slippage,
            "a 50bps gamma intercept should push the calibrated estimate above the book heuristic"
        );
    }
}
