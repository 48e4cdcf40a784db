//! Rebalancer, spec §4.6: decide whether to replace an incumbent pair
//! with a newly proposed plan.

use fra_loss::{CandidateCosts, LossLedger};
use fra_schemas::plan::ExecutionPlan;
use fra_schemas::position::{Position, PositionSide};
use fra_schemas::PERIODS_PER_YEAR_HOURLY;

#[derive(Debug, Clone, PartialEq)]
pub enum RebalanceDecision {
    Rebalance { reason: RebalanceReason },
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RebalanceReason {
    InstantlyProfitable,
    IncumbentNeverBreaksEven,
    FasterBreakEven { hours_saved: f64 },
}

/// Spec §4.6 step 1: sign-flip the raw venue funding rate to the
/// position's perspective — a SHORT position earns (doesn't pay) when
/// the raw rate is positive.
pub fn signed_funding_rate(position_side: PositionSide, raw_funding_rate: f64) -> f64 {
    match position_side {
        PositionSide::Long => raw_funding_rate,
        PositionSide::Short => -raw_funding_rate,
    }
}

/// Runs the full §4.6 decision. `current_funding_rate` is the *raw*
/// venue-reported rate for the incumbent's (symbol, venue); this
/// function applies the sign flip per step 1.
pub fn decide(
    ledger: &LossLedger,
    current_position: &Position,
    current_funding_rate_raw: f64,
    current_notional: f64,
    new_plan: &ExecutionPlan,
    new_notional: f64,
    now: chrono::DateTime<chrono::Utc>,
) -> RebalanceDecision {
    let signed_rate = signed_funding_rate(current_position.side, current_funding_rate_raw);
    let cumulative_loss = ledger.cumulative_loss();

    let current_break_even_hours =
        ledger.remaining_break_even_hours(&current_position.key(), signed_rate, current_notional, now);

    let new_hourly_return = (new_plan.opportunity.expected_apy() / PERIODS_PER_YEAR_HOURLY) * new_notional;
    let half_fees = new_plan.estimated_costs.total() / 2.0;
    let new_break_even_hours = LossLedger::adjusted_break_even_hours(
        CandidateCosts { hourly_return: new_hourly_return, entry_costs: half_fees, exit_costs: half_fees },
        cumulative_loss,
    );

    if new_plan.expected_net_return_per_period > 0.0 {
        return RebalanceDecision::Rebalance { reason: RebalanceReason::InstantlyProfitable };
    }
    if current_break_even_hours.is_infinite() && new_break_even_hours.is_finite() {
        return RebalanceDecision::Rebalance { reason: RebalanceReason::IncumbentNeverBreaksEven };
    }
    if current_break_even_hours.is_infinite() && new_break_even_hours.is_infinite() {
        return RebalanceDecision::Hold;
    }
    if new_break_even_hours < current_break_even_hours {
        return RebalanceDecision::Rebalance {
            reason: RebalanceReason::FasterBreakEven { hours_saved: current_break_even_hours - new_break_even_hours },
        };
    }
    RebalanceDecision::Hold
}
