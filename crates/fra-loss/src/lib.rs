//! LossTracker / LossLedger, spec §4.8.
//!
//! Tracks realized loss and the break-even horizon remaining on a position,
//! so the rebalancer (`fra-rebalance`) can weigh an incumbent's sunk costs
//! against a new candidate's.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Recorded at position entry: the fee/slippage cost paid to open, and
/// when. `entry_time` drives the funding-accrual estimate used by
/// [`LossLedger::remaining_break_even_hours`].
#[derive(Debug, Clone, Copy)]
struct OpenRecord {
    entry_cost: f64,
    entry_time: DateTime<Utc>,
}

/// Inputs to [`LossLedger::adjusted_break_even_hours`] — a new candidate's
/// projected hourly return and round-trip costs (spec §4.6 step 4:
/// `entryCosts=plan.fees/2, exitCosts=plan.fees/2`).
#[derive(Debug, Clone, Copy)]
pub struct CandidateCosts {
    pub hourly_return: f64,
    pub entry_costs: f64,
    pub exit_costs: f64,
}

/// Per-strategy realized-loss ledger and per-position cost tracker.
/// Keyed by [`fra_schemas::position::Position::key`].
pub struct LossLedger {
    open: Mutex<HashMap<String, OpenRecord>>,
    cumulative_loss: Mutex<f64>,
}

impl Default for LossLedger {
    fn default() -> Self {
        Self { open: Mutex::new(HashMap::new()), cumulative_loss: Mutex::new(0.0) }
    }
}

impl LossLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the entry cost paid to open a position.
    pub fn record_entry(&self, key: &str, entry_cost: f64, now: DateTime<Utc>) {
        self.open.lock().unwrap().insert(key.to_string(), OpenRecord { entry_cost, entry_time: now });
    }

    /// Records a closed position's realized pnl and exit cost. If the
    /// round trip netted a loss (`entryCost + exitCost - realizedPnl > 0`),
    /// that shortfall accumulates into `cumulativeLoss()`.
    pub fn record_exit(&self, key: &str, realized_pnl: f64, exit_cost: f64) {
        let Some(record) = self.open.lock().unwrap().remove(key) else {
            return;
        };
        let net = record.entry_cost + exit_cost - realized_pnl;
        if net > 0.0 {
            *self.cumulative_loss.lock().unwrap() += net;
        }
    }

    pub fn cumulative_loss(&self) -> f64 {
        *self.cumulative_loss.lock().unwrap()
    }

    /// `(unrecoveredCosts - accruedFunding) / max(eps, fundingPerHour)`,
    /// spec §4.8. `unrecoveredCosts` is the position's recorded entry
    /// cost; `accruedFunding` is estimated as `currentFundingRate *
    /// notional * hoursSinceEntry`, since the ledger doesn't separately
    /// track funding receipts per position. Returns `f64::INFINITY` if
    /// `fundingPerHour <= 0` or the position has no recorded entry.
    pub fn remaining_break_even_hours(&self, key: &str, current_funding_rate: f64, notional: f64, now: DateTime<Utc>) -> f64 {
        let funding_per_hour = current_funding_rate * notional;
        if funding_per_hour <= 0.0 {
            return f64::INFINITY;
        }
        let Some(record) = self.open.lock().unwrap().get(key).copied() else {
            return f64::INFINITY;
        };
        let hours_since_entry = (now - record.entry_time).num_milliseconds() as f64 / 3_600_000.0;
        let accrued_funding = funding_per_hour * hours_since_entry.max(0.0);
        let unrecovered_costs = record.entry_cost;
        (unrecovered_costs - accrued_funding) / funding_per_hour.max(fra_schemas::SIZE_EPSILON)
    }

    /// `(entryCosts + exitCosts + cumulativeLoss) / max(eps, hourlyReturn)`,
    /// spec §4.8. A pure function of its inputs — doesn't read per-position
    /// state, only the `cumulativeLoss` the caller supplies.
    pub fn adjusted_break_even_hours(costs: CandidateCosts, cumulative_loss: f64) -> f64 {
        if costs.hourly_return <= 0.0 {
            return f64::INFINITY;
        }
        (costs.entry_costs + costs.exit_costs + cumulative_loss) / costs.hourly_return.max(fra_schemas::SIZE_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cumulative_loss_starts_at_zero() {
        let ledger = LossLedger::new();
        assert_eq!(ledger.cumulative_loss(), 0.0);
    }

    #[test]
    fn a_losing_round_trip_accumulates_cumulative_loss() {
        let ledger = LossLedger::new();
        let now = Utc::now();
        ledger.record_entry("A:BTC", 50.0, now);
        ledger.record_exit("A:BTC", -10.0, 20.0);
        assert!((ledger.cumulative_loss() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn a_winning_round_trip_does_not_accumulate_loss() {
        let ledger = LossLedger::new();
        let now = Utc::now();
        ledger.record_entry("A:BTC", 50.0, now);
        ledger.record_exit("A:BTC", 500.0, 20.0);
        assert_eq!(ledger.cumulative_loss(), 0.0);
    }

    #[test]
    fn remaining_break_even_is_infinite_for_nonpositive_funding() {
        let ledger = LossLedger::new();
        let now = Utc::now();
        ledger.record_entry("A:BTC", 50.0, now);
        assert_eq!(ledger.remaining_break_even_hours("A:BTC", -1e-4, 10_000.0, now), f64::INFINITY);
        assert_eq!(ledger.remaining_break_even_hours("A:BTC", 0.0, 10_000.0, now), f64::INFINITY);
    }

    #[test]
    fn remaining_break_even_shrinks_as_funding_accrues() {
        let ledger = LossLedger::new();
        let entry = Utc::now();
        ledger.record_entry("A:BTC", 100.0, entry);
        let at_entry = ledger.remaining_break_even_hours("A:BTC", 1e-4, 10_000.0, entry);
        let ten_hours_later = ledger.remaining_break_even_hours("A:BTC", 1e-4, 10_000.0, entry + Duration::hours(10));
        assert!(ten_hours_later < at_entry);
    }

    #[test]
    fn untracked_position_has_infinite_remaining_break_even() {
        let ledger = LossLedger::new();
        assert_eq!(ledger.remaining_break_even_hours("nope", 1e-4, 10_000.0, Utc::now()), f64::INFINITY);
    }

    #[test]
    fn adjusted_break_even_is_infinite_for_nonpositive_return() {
        let costs = CandidateCosts { hourly_return: 0.0, entry_costs: 10.0, exit_costs: 10.0 };
        assert_eq!(LossLedger::adjusted_break_even_hours(costs, 0.0), f64::INFINITY);
    }

    #[test]
    fn adjusted_break_even_decreases_strictly_as_return_grows() {
        let low = CandidateCosts { hourly_return: 1.0, entry_costs: 10.0, exit_costs: 10.0 };
        let high = CandidateCosts { hourly_return: 2.0, entry_costs: 10.0, exit_costs: 10.0 };
        assert!(LossLedger::adjusted_break_even_hours(high, 5.0) < LossLedger::adjusted_break_even_hours(low, 5.0));
    }

    #[test]
    fn adjusted_break_even_increases_strictly_with_cumulative_loss() {
        let costs = CandidateCosts { hourly_return: 1.0, entry_costs: 10.0, exit_costs: 10.0 };
        assert!(LossLedger::adjusted_break_even_hours(costs, 10.0) > LossLedger::adjusted_break_even_hours(costs, 5.0));
    }
}
