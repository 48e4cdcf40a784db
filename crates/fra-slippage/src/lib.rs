//! fra-slippage: the calibrated `SlippageModel`, spec §2.
//!
//! `slippage_bps = alpha * sqrt(size/depth) + beta * spread_bps + gamma`.
//! The coefficient type itself lives in `fra-schemas` (it's a shared data
//! shape); this crate owns prediction convenience and calibration.
//!
//! Calibration (fitting `alpha`/`beta`/`gamma` from realized fills) is a
//! supplement beyond spec.md's distillation — spec §3 describes the
//! coefficients as data that exists "per-symbol" but is silent on how they
//! are produced. The normal-equations least-squares solve is grounded in
//! `cosmic-lab-inc-arbiter/nexus/src/math/regression.rs`'s
//! `quadratic_least_squares` (`(XᵀX)⁻¹Xᵀy` via `nalgebra`), adapted from a
//! dynamically-sized design matrix to the fixed 3-feature case here.

use chrono::Utc;
use fra_schemas::profile::SlippageModelCoefficients;
use nalgebra::{Matrix3, Vector3};

/// A single realized-fill observation used to calibrate the model.
#[derive(Debug, Clone, Copy)]
pub struct SlippageSample {
    pub position_usd: f64,
    pub book_depth_usd: f64,
    pub spread_bps: f64,
    pub realized_slippage_bps: f64,
}

/// Predict slippage in basis points for a prospective order.
pub fn predict_bps(
    coeffs: &SlippageModelCoefficients,
    position_usd: f64,
    book_depth_usd: f64,
    spread_bps: f64,
) -> f64 {
    coeffs.predict_bps(position_usd, book_depth_usd, spread_bps)
}

/// Ordinary-least-squares fit of `alpha`, `beta`, `gamma` against
/// `realized = alpha*sqrt(pos/depth) + beta*spread + gamma`, via the normal
/// equations on the 3 features `(sqrt(pos/depth), spread_bps, 1)`.
///
/// Returns [`SlippageModelCoefficients::uncalibrated`] if fewer than 4
/// samples are supplied or the normal-equation matrix is singular — a
/// 3-parameter fit from 3 or fewer points is not a fit, it's an exact
/// interpolation that would silently overfit the next symbol's data.
pub fn calibrate(samples: &[SlippageSample]) -> SlippageModelCoefficients {
    if samples.len() < 4 {
        return SlippageModelCoefficients::uncalibrated();
    }

    // Build X^T X (3x3) and X^T y (3x1) for features [x1, x2, 1].
    let mut xtx = Matrix3::<f64>::zeros();
    let mut xty = Vector3::<f64>::zeros();

    for s in samples {
        if s.book_depth_usd <= 0.0 || !s.realized_slippage_bps.is_finite() {
            continue;
        }
        let x1 = (s.position_usd / s.book_depth_usd).max(0.0).sqrt();
        let x2 = s.spread_bps;
        let x = Vector3::new(x1, x2, 1.0);
        let y = s.realized_slippage_bps;

        xtx += x * x.transpose();
        xty += x * y;
    }

    match solve_3x3(xtx, xty) {
        Some(coeffs) => {
            let (alpha, beta, gamma) = (coeffs[0], coeffs[1], coeffs[2]);
            SlippageModelCoefficients {
                alpha,
                beta,
                gamma,
                r_squared: r_squared(samples, alpha, beta, gamma),
                sample_size: samples.len() as u64,
                last_calibrated: Utc::now(),
            }
        }
        None => SlippageModelCoefficients::uncalibrated(),
    }
}

fn r_squared(samples: &[SlippageSample], alpha: f64, beta: f64, gamma: f64) -> f64 {
    let ys: Vec<f64> = samples.iter().map(|s| s.realized_slippage_bps).collect();
    let mean_y = ys.iter().sum::<f64>() / ys.len() as f64;
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for s in samples {
        let depth = if s.book_depth_usd > 0.0 { s.book_depth_usd } else { 1.0 };
        let pred = alpha * (s.position_usd / depth).max(0.0).sqrt() + beta * s.spread_bps + gamma;
        ss_res += (s.realized_slippage_bps - pred).powi(2);
        ss_tot += (s.realized_slippage_bps - mean_y).powi(2);
    }
    if ss_tot <= 0.0 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    }
}

/// Solves the 3x3 normal-equations system `(XᵀX) coeffs = Xᵀy` via
/// `nalgebra`'s matrix inverse, the same `(XᵀX)⁻¹Xᵀy` shape
/// `cosmic-lab-inc-arbiter`'s `quadratic_least_squares` uses for its
/// (larger, dynamically-sized) design matrix. Returns `None` if `XᵀX` is
/// singular, which for this feature set only happens with degenerate
/// input (e.g. every sample at the same `sqrt(pos/depth)` and spread).
fn solve_3x3(xtx: Matrix3<f64>, xty: Vector3<f64>) -> Option<Vector3<f64>> {
    xtx.try_inverse().map(|inv| inv * xty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_samples_yields_uncalibrated() {
        let c = calibrate(&[]);
        assert_eq!(c.sample_size, 0);
    }

    #[test]
    fn recovers_known_linear_relationship() {
        // y = 2*x1 + 0.5*x2 + 1, noiseless.
        let samples: Vec<SlippageSample> = (1..20)
            .map(|i| {
                let pos = i as f64 * 1000.0;
                let depth = 1_000_000.0;
                let spread = (i % 5) as f64;
                let x1 = (pos / depth).sqrt();
                let y = 2.0 * x1 + 0.5 * spread + 1.0;
                SlippageSample {
                    position_usd: pos,
                    book_depth_usd: depth,
                    spread_bps: spread,
                    realized_slippage_bps: y,
                }
            })
            .collect();
        let c = calibrate(&samples);
        assert!((c.alpha - 2.0).abs() < 1e-6);
        assert!((c.beta - 0.5).abs() < 1e-6);
        assert!((c.gamma - 1.0).abs() < 1e-6);
        assert!(c.r_squared > 0.99);
    }

    #[test]
    fn predict_matches_schema_formula() {
        let c = SlippageModelCoefficients {
            alpha: 2.0,
            beta: 0.5,
            gamma: 1.0,
            r_squared: 1.0,
            sample_size: 10,
            last_calibrated: Utc::now(),
        };
        let got = predict_bps(&c, 10_000.0, 1_000_000.0, 4.0);
        let expected = 2.0 * (10_000.0f64 / 1_000_000.0).sqrt() + 0.5 * 4.0 + 1.0;
        assert!((got - expected).abs() < 1e-9);
    }
}
