use crate::opportunity::Opportunity;
use crate::order::OrderRequest;
use chrono::{DateTime, Utc};

/// Spec §3 ExecutionPlan `estimatedCosts`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CostBreakdown {
    pub entry_fees: f64,
    pub exit_fees: f64,
    pub slippage: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.entry_fees + self.exit_fees + self.slippage
    }
}

/// Spec §3 ExecutionPlan.
///
/// Invariant enforced at construction (see `fra-execution-plan`):
/// `longOrder.size == shortOrder.size == baseAssetSize > 0`; both prices
/// finite and positive; `expectedNetReturnPerPeriod > 0`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecutionPlan {
    pub opportunity: Opportunity,
    pub long_order: OrderRequest,
    pub short_order: OrderRequest,
    pub base_asset_size: f64,
    pub estimated_costs: CostBreakdown,
    pub expected_net_return_per_period: f64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Delta-neutrality check (spec §8 Testable Property 1).
    pub fn is_delta_neutral(&self) -> bool {
        (self.long_order.size - self.short_order.size).abs() < 1e-6
            && (self.long_order.size - self.base_asset_size).abs() < 1e-6
    }
}
