//! fra-schemas: shared data model for the funding-rate arbitrage core.
//!
//! Every type here is a plain value type — no I/O, no broker calls. Venue
//! adapters and the historical-rate service (both external collaborators,
//! see `fra-adapters`) produce and consume these shapes; the decision and
//! execution crates (`fra-portfolio`, `fra-execution-plan`, `fra-executor`,
//! `fra-position`, `fra-rebalance`, `fra-twap`) operate purely on them.
//!
//! Monetary and size fields are `f64`. Every constructor that accepts
//! caller-supplied monetary/size/rate input validates finiteness via
//! [`require_finite`] at the boundary, per the numerics design note: a
//! single central `is_finite` guard rather than ad-hoc NaN checks scattered
//! through the call graph.

pub mod fill;
pub mod order;
pub mod opportunity;
pub mod plan;
pub mod position;
pub mod profile;

pub use fill::AsymmetricFill;
pub use opportunity::Opportunity;
pub use order::{ExchangeTag, OrderRequest, OrderResponse, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use plan::{CostBreakdown, ExecutionPlan};
pub use position::{Position, PositionSide};
pub use profile::{LiquidityProfile, ReplenishmentProfile, SlippageModelCoefficients};

/// Base-unit size epsilon below which a position/order size is treated as
/// zero (spec §9 numerics note).
pub const SIZE_EPSILON: f64 = 1e-4;

/// Funding periods per year for hourly funding venues (spec §4.2, GLOSSARY).
pub const PERIODS_PER_YEAR_HOURLY: f64 = 8760.0;

/// Returns `Err(msg)` if any value is NaN or infinite.
pub fn require_finite(label: &'static str, v: f64) -> Result<f64, String> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{label} is not finite: {v}"))
    }
}

/// Mapping of venue name to available USD collateral (spec §3 Balances).
///
/// Invariant: every value is `>= 0`. Construct via [`Balances::new`] which
/// clamps negative inputs to `0.0` and logs nothing — the caller (the
/// orchestrator) is responsible for treating a clamp as a `VenueError`
/// signal if it cares to.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Balances {
    by_venue: std::collections::BTreeMap<String, f64>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, venue: impl Into<String>, usd: f64) {
        self.by_venue.insert(venue.into(), usd.max(0.0));
    }

    pub fn get(&self, venue: &str) -> f64 {
        self.by_venue.get(venue).copied().unwrap_or(0.0)
    }

    /// Subtract margin already used by existing positions, per spec §3:
    /// "margin already used by existing positions is subtracted before use."
    pub fn subtract_used_margin(&mut self, venue: &str, used: f64) {
        let entry = self.by_venue.entry(venue.to_string()).or_insert(0.0);
        *entry = (*entry - used).max(0.0);
    }
}
