//! Portfolio risk report, spec §7: "expected APY with confidence
//! interval, VaR95, maximum drawdown, Sharpe, stress tests, concentration
//! via Herfindahl index, correlation, volatility breakdown".
//!
//! §3/§4 give this no home (supplemented per the expanded spec); fields
//! degrade to `None` rather than a phantom number whenever the
//! underlying history is insufficient, per §7's explicit instruction.
//! `max_drawdown` and `correlation` are permanently `None`: this core
//! tracks cumulative realized loss (§4.8), not a position-value time
//! series or pairwise return history, and the Non-goals explicitly
//! exclude an accounting/PnL ledger beyond that.

use fra_adapters::historical::VolatilityMetrics;
use fra_portfolio::{Allocation, OpportunityAssessment, PortfolioAllocation};

/// One opportunity's contribution to the risk report, keyed the same
/// way `fra_portfolio::opportunity_key` does.
#[derive(Debug, Clone)]
pub struct VolatilityBreakdownEntry {
    pub key: String,
    pub metrics: Option<VolatilityMetrics>,
}

#[derive(Debug, Clone)]
pub struct RiskReport {
    pub expected_apy: f64,
    /// `(low, high)` around `expected_apy`, widened by the capital-
    /// weighted average instability. `None` if any allocated opportunity
    /// lacks volatility history.
    pub expected_apy_confidence_interval: Option<(f64, f64)>,
    pub var_95: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe: Option<f64>,
    pub herfindahl_index: f64,
    pub correlation: Option<f64>,
    pub volatility_breakdown: Vec<VolatilityBreakdownEntry>,
}

const Z_95: f64 = 1.645;

/// Builds the report from the portfolio allocation and the same
/// assessments that produced it. `assessments` must be the accepted set
/// `allocation` was built from — entries are matched by
/// `opportunity_key`.
pub fn build(allocation: &PortfolioAllocation, assessments: &[OpportunityAssessment]) -> RiskReport {
    let total = allocation.total_allocated_usd;
    let herfindahl_index = herfindahl(allocation);

    if total <= 0.0 || allocation.allocations.is_empty() {
        return RiskReport {
            expected_apy: 0.0,
            expected_apy_confidence_interval: None,
            var_95: None,
            max_drawdown: None,
            sharpe: None,
            herfindahl_index,
            correlation: None,
            volatility_breakdown: Vec::new(),
        };
    }

    let mut volatility_breakdown = Vec::with_capacity(assessments.len());
    let mut weighted_instability = 0.0f64;
    let mut have_all_volatility = true;
    let mut covered_keys: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for assessment in assessments {
        let key = fra_portfolio::opportunity_key(assessment);
        let Some(weight) = weight_of(allocation, &key, total) else {
            continue;
        };
        covered_keys.insert(key.clone());
        match assessment.volatility {
            Some(v) => weighted_instability += weight * (1.0 - v.stability_score),
            None => have_all_volatility = false,
        }
        volatility_breakdown.push(VolatilityBreakdownEntry { key, metrics: assessment.volatility });
    }
    // Every allocated opportunity needs a matching assessment to trust the
    // volatility-weighted estimate; an allocation key with no assessment
    // behind it is itself missing data, not zero instability.
    if covered_keys.len() != allocation.allocations.len() {
        have_all_volatility = false;
    }

    let (var_95, sharpe, confidence_interval) = if have_all_volatility {
        // Parametric estimate: treat `weightedInstability * expectedApy` as a
        // one-sigma proxy for the portfolio's annualized return dispersion,
        // since this core has no realized-return time series to estimate
        // sigma from directly.
        let sigma = weighted_instability * allocation.aggregate_apy;
        let var_95 = allocation.aggregate_apy - Z_95 * sigma;
        let sharpe = if sigma > 0.0 { allocation.aggregate_apy / sigma } else { f64::INFINITY };
        let ci = (allocation.aggregate_apy - sigma, allocation.aggregate_apy + sigma);
        (Some(var_95), Some(sharpe), Some(ci))
    } else {
        (None, None, None)
    };

    RiskReport {
        expected_apy: allocation.aggregate_apy,
        expected_apy_confidence_interval: confidence_interval,
        var_95,
        max_drawdown: None,
        sharpe,
        herfindahl_index,
        correlation: None,
        volatility_breakdown,
    }
}

fn weight_of(allocation: &PortfolioAllocation, key: &str, total: f64) -> Option<f64> {
    allocation.allocations.get(key).map(|a: &Allocation| a.notional_usd / total)
}

/// Concentration via Herfindahl index: `sum(weight_i^2)`, `1/N` for an
/// equal-weighted portfolio of `N`, `1.0` for a single-opportunity book.
fn herfindahl(allocation: &PortfolioAllocation) -> f64 {
    let total = allocation.total_allocated_usd;
    if total <= 0.0 {
        return 0.0;
    }
    allocation.allocations.values().map(|a| (a.notional_usd / total).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_allocation_yields_zero_herfindahl_and_no_confidence_interval() {
        let allocation = PortfolioAllocation::default();
        let report = build(&allocation, &[]);
        assert_eq!(report.herfindahl_index, 0.0);
        assert!(report.expected_apy_confidence_interval.is_none());
        assert!(report.max_drawdown.is_none());
        assert!(report.correlation.is_none());
    }

    #[test]
    fn single_opportunity_portfolio_has_herfindahl_one() {
        let mut allocations = BTreeMap::new();
        allocations.insert("BTC:A:B".to_string(), Allocation { notional_usd: 1000.0, net_apy: 0.3 });
        let allocation = PortfolioAllocation { allocations, aggregate_apy: 0.3, total_allocated_usd: 1000.0 };
        let report = build(&allocation, &[]);
        assert!((report.herfindahl_index - 1.0).abs() < 1e-9);
    }

    #[test]
    fn two_equal_opportunities_have_herfindahl_one_half() {
        let mut allocations = BTreeMap::new();
        allocations.insert("BTC:A:B".to_string(), Allocation { notional_usd: 500.0, net_apy: 0.3 });
        allocations.insert("ETH:A:B".to_string(), Allocation { notional_usd: 500.0, net_apy: 0.3 });
        let allocation = PortfolioAllocation { allocations, aggregate_apy: 0.3, total_allocated_usd: 1000.0 };
        let report = build(&allocation, &[]);
        assert!((report.herfindahl_index - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_volatility_data_degrades_var_and_sharpe_to_none() {
        let mut allocations = BTreeMap::new();
        allocations.insert("BTC:A:B".to_string(), Allocation { notional_usd: 1000.0, net_apy: 0.3 });
        let allocation = PortfolioAllocation { allocations, aggregate_apy: 0.3, total_allocated_usd: 1000.0 };
        // assessment's volatility is genuinely None (not just an empty
        // assessments slice), exercising the partial-volatility path §7
        // actually documents.
        let assessment = fra_portfolio::testkit::assessment_fixture(1000.0, 1.0, None);
        let report = build(&allocation, std::slice::from_ref(&assessment));
        assert!(report.var_95.is_none());
        assert!(report.sharpe.is_none());
    }
}
