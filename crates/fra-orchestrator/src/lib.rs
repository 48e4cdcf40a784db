//! StrategyOrchestrator, spec §2 data flow and §7 structured reporting.
//!
//! Drives one decision-and-execution pass: assess opportunities, build
//! candidate plans, allocate capital, decide on rebalancing incumbents,
//! close/open positions, resolve any asymmetric fill, and record costs
//! into the loss ledger. Opportunity discovery, balance fetching, and
//! logging *initialization* are the embedding application's job (spec
//! §1) — this crate only consumes them as already-fetched inputs.

pub mod risk_report;

use anyhow::Context;
use fra_adapters::error::CoreResult;
use fra_adapters::historical::HistoricalRateFeed;
use fra_adapters::venue::{BestBidAsk, VenueAdapter};
use fra_config::StrategyConfig;
use fra_execution_plan::BuildRequest;
use fra_historical::HistoricalRateView;
use fra_loss::CandidateCosts;
use fra_position::PositionManager;
use fra_rebalance::RebalanceDecision;
use fra_schemas::opportunity::Opportunity;
use fra_schemas::plan::ExecutionPlan;
use fra_schemas::position::Position;
use fra_twap::TwapEngine;
use risk_report::RiskReport;

/// Owns the process-local shared mutable state spec §5 names: the
/// position manager's idempotency locks, the loss ledger, and the TWAP
/// active-execution table.
pub struct StrategyOrchestrator {
    pub config: StrategyConfig,
    pub positions: PositionManager,
    pub loss_ledger: fra_loss::LossLedger,
    pub twap: TwapEngine,
}

impl Default for StrategyOrchestrator {
    fn default() -> Self {
        Self {
            config: StrategyConfig::default(),
            positions: PositionManager::default(),
            loss_ledger: fra_loss::LossLedger::new(),
            twap: TwapEngine::new(),
        }
    }
}

impl StrategyOrchestrator {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config, ..Self::default() }
    }
}

/// Per-opportunity venue metadata the caller already knows (fetched
/// alongside the opportunity itself) and the orchestrator can't derive.
pub struct OpportunityContext {
    pub long_sample_points: usize,
    pub short_sample_points: usize,
    pub long_funding_interval_hours: u8,
    pub short_funding_interval_hours: u8,
}

/// Pre-fetched inputs for one pass. Adapter/rate/context lookups are
/// plain closures rather than a trait so call sites (tests, a real
/// daemon) can supply them however's convenient.
pub struct CycleInputs<'a> {
    pub opportunities: &'a [Opportunity],
    pub context_for: &'a dyn Fn(&Opportunity) -> OpportunityContext,
    pub adapter_for: &'a dyn Fn(&str) -> Option<&'a dyn VenueAdapter>,
    pub history: &'a HistoricalRateView<dyn HistoricalRateFeed>,
    pub existing_positions: &'a [Position],
    /// Raw (unsigned) venue-reported funding rate for (symbol, venue),
    /// used both for plan costing and the rebalancer's sign flip.
    pub current_funding_rate: &'a dyn Fn(&str, &str) -> f64,
    pub total_capital_usd: f64,
}

#[derive(Debug, Clone)]
pub struct RebalanceRecord {
    pub symbol: String,
    pub decision: RebalanceDecision,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub opportunities_evaluated: usize,
    pub plans_built: usize,
    pub selected_opportunities: Vec<String>,
    pub rebalance_decisions: Vec<RebalanceRecord>,
    pub closed_count: usize,
    pub still_open_count: usize,
    pub errors: Vec<String>,
    pub success: bool,
}

async fn resolve_best_bid_ask(adapter: &dyn VenueAdapter, symbol: &str) -> CoreResult<BestBidAsk> {
    match adapter.get_best_bid_ask(symbol).await? {
        Some(book) => Ok(book),
        None => {
            let mark = adapter.get_mark_price(symbol).await?;
            Ok(BestBidAsk::synthesize_from_mark(mark))
        }
    }
}

/// Runs one full decision-and-execution pass (spec §2's data flow).
/// Never panics on a per-opportunity failure: every step records its
/// error into `errors` and moves to the next candidate, matching §7's
/// "the Orchestrator collects a list of per-opportunity error strings
/// into the cycle result" propagation policy.
pub async fn run_cycle(orchestrator: &StrategyOrchestrator, inputs: CycleInputs<'_>) -> (CycleReport, RiskReport) {
    let span = tracing::info_span!("decision_cycle");
    let _enter = span.enter();

    let mut report = CycleReport { opportunities_evaluated: inputs.opportunities.len(), ..Default::default() };
    let mut assessments = Vec::new();

    for opportunity in inputs.opportunities {
        let outcome = assess_one(orchestrator, &inputs, opportunity)
            .await
            .with_context(|| format!("assessing opportunity {}", opportunity.symbol));
        match outcome {
            Ok(Some(assessment)) => assessments.push(assessment),
            Ok(None) => {}
            Err(e) => report.errors.push(format!("{e:#}")),
        }
    }

    let allocation = fra_portfolio::allocate(
        &assessments,
        inputs.total_capital_usd,
        orchestrator.config.target_aggregate_apy,
        orchestrator.config.max_portfolio_usd,
    );
    report.selected_opportunities = allocation.allocations.keys().cloned().collect();

    for position in inputs.existing_positions {
        if let Some((opportunity, notional)) = matching_new_candidate(&allocation, &assessments, position) {
            let plan_outcome = build_plan_for(orchestrator, &inputs, opportunity, Some(notional))
                .await
                .with_context(|| format!("building rebalance candidate plan for {}", position.symbol));
            match plan_outcome {
                Ok(plan) => {
                    report.plans_built += 1;
                    let raw_rate = (inputs.current_funding_rate)(&position.symbol, &position.venue);
                    let decision = fra_rebalance::decide(
                        &orchestrator.loss_ledger,
                        position,
                        raw_rate,
                        position.size.abs() * position.mark_price,
                        &plan,
                        notional,
                        chrono::Utc::now(),
                    );
                    report.rebalance_decisions.push(RebalanceRecord { symbol: position.symbol.clone(), decision: decision.clone() });
                    if matches!(decision, RebalanceDecision::Rebalance { .. }) {
                        execute_rebalance(orchestrator, &inputs, position, &plan, &mut report).await;
                    }
                }
                Err(e) => report.errors.push(format!("{e:#}")),
            }
        }
    }

    let risk = risk_report::build(&allocation, &assessments);
    report.success = true;

    tracing::info!(
        opportunities_evaluated = report.opportunities_evaluated,
        plans_built = report.plans_built,
        selected = report.selected_opportunities.len(),
        rebalances = report.rebalance_decisions.len(),
        closed = report.closed_count,
        still_open = report.still_open_count,
        errors = report.errors.len(),
        expected_apy = risk.expected_apy,
        herfindahl_index = risk.herfindahl_index,
        "decision cycle complete"
    );

    (report, risk)
}

async fn assess_one(
    orchestrator: &StrategyOrchestrator,
    inputs: &CycleInputs<'_>,
    opportunity: &Opportunity,
) -> CoreResult<Option<fra_portfolio::OpportunityAssessment>> {
    let long_adapter = (inputs.adapter_for)(&opportunity.long_venue)
        .ok_or_else(|| fra_adapters::error::CoreError::AdapterUnavailable { venue: opportunity.long_venue.as_str().into() })?;
    let short_adapter = (inputs.adapter_for)(&opportunity.short_venue)
        .ok_or_else(|| fra_adapters::error::CoreError::AdapterUnavailable { venue: opportunity.short_venue.as_str().into() })?;

    let long_book = resolve_best_bid_ask(long_adapter, &opportunity.symbol).await?;
    let short_book = resolve_best_bid_ask(short_adapter, &opportunity.symbol).await?;
    let context = (inputs.context_for)(opportunity);

    let assessment = fra_portfolio::assess_opportunity(
        opportunity,
        long_book,
        short_book,
        orchestrator.config.maker_fee_rate(&opportunity.long_venue),
        orchestrator.config.maker_fee_rate(&opportunity.short_venue),
        context.long_sample_points,
        context.short_sample_points,
        context.long_funding_interval_hours,
        context.short_funding_interval_hours,
        inputs.history,
        &orchestrator.config,
    )
    .await?;

    Ok(assessment.accepted())
}

async fn build_plan_for(
    orchestrator: &StrategyOrchestrator,
    inputs: &CycleInputs<'_>,
    opportunity: &Opportunity,
    max_position_usd: Option<f64>,
) -> CoreResult<ExecutionPlan> {
    let long_adapter = (inputs.adapter_for)(&opportunity.long_venue);
    let short_adapter = (inputs.adapter_for)(&opportunity.short_venue);
    fra_execution_plan::build_plan(BuildRequest {
        opportunity,
        long_adapter,
        short_adapter,
        override_long_mark: None,
        override_short_mark: None,
        max_position_usd,
        config: &orchestrator.config,
        // No per-cycle calibration-profile input surface yet (spec §1
        // leaves calibration data sourcing to the embedding app); plans
        // still build, just without the tighter calibrated sizing/cost.
        long_liquidity_profile: None,
        short_liquidity_profile: None,
        slippage_coefficients: None,
    })
    .await
}

/// Finds the allocated opportunity (if any) whose symbol matches
/// `position`'s, for the rebalancer to weigh against the incumbent.
fn matching_new_candidate<'a>(
    allocation: &fra_portfolio::PortfolioAllocation,
    assessments: &'a [fra_portfolio::OpportunityAssessment],
    position: &Position,
) -> Option<(&'a Opportunity, f64)> {
    assessments.iter().find_map(|a| {
        if fra_schemas::position::Position::normalize_symbol(&a.opportunity.symbol) != fra_schemas::position::Position::normalize_symbol(&position.symbol) {
            return None;
        }
        let key = fra_portfolio::opportunity_key(a);
        allocation.allocations.get(&key).map(|alloc| (&a.opportunity, alloc.notional_usd))
    })
}

async fn execute_rebalance(
    orchestrator: &StrategyOrchestrator,
    inputs: &CycleInputs<'_>,
    incumbent: &Position,
    new_plan: &ExecutionPlan,
    report: &mut CycleReport,
) {
    let close_result = orchestrator.positions.close(inputs.adapter_for, std::slice::from_ref(incumbent), &orchestrator.config).await;
    report.closed_count += close_result.closed.len();
    report.still_open_count += close_result.still_open.len();
    if !close_result.still_open.is_empty() {
        for (position, detail) in &close_result.still_open {
            report.errors.push(format!("close failed for {}: {detail}", position.symbol));
        }
        return;
    }

    let Some(long_adapter) = (inputs.adapter_for)(&new_plan.opportunity.long_venue) else {
        report.errors.push(format!("{}: no adapter for long venue", new_plan.opportunity.symbol));
        return;
    };
    let Some(short_adapter) = (inputs.adapter_for)(&new_plan.opportunity.short_venue) else {
        report.errors.push(format!("{}: no adapter for short venue", new_plan.opportunity.symbol));
        return;
    };

    match fra_executor::place_pair(
        new_plan,
        long_adapter,
        short_adapter,
        orchestrator.config.asymmetric_fill_timeout_ms,
        orchestrator.config.order_wait_base_interval_ms,
    )
    .await
    {
        Ok(fra_executor::PlacementOutcome::BothFilled { .. }) => {
            let half_fees = new_plan.estimated_costs.total() / 2.0;
            let key = Position { venue: new_plan.opportunity.long_venue.clone(), symbol: new_plan.opportunity.symbol.clone(), side: fra_schemas::position::PositionSide::Long, size: new_plan.base_asset_size, entry_price: 0.0, mark_price: 0.0, leverage: orchestrator.config.leverage, margin_used: 0.0 }
                .key();
            orchestrator.loss_ledger.record_entry(&key, half_fees, chrono::Utc::now());
        }
        Ok(fra_executor::PlacementOutcome::Asymmetric(af)) => {
            let _ = CandidateCosts { hourly_return: 0.0, entry_costs: 0.0, exit_costs: 0.0 };
            report.errors.push(format!("{}: asymmetric fill pending resolution", af.symbol));
        }
        Ok(fra_executor::PlacementOutcome::NeitherFilled { .. }) => {
            report.errors.push(format!("{}: neither leg filled", new_plan.opportunity.symbol));
        }
        Err(e) => report.errors.push(format!("{}: {e}", new_plan.opportunity.symbol)),
    }
}
