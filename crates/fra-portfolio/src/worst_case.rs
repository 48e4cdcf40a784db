//! "Worst-case opportunity" selection fallback, spec §9 design note.
//!
//! Used only when [`crate::max_notional::search_max_notional`] finds no
//! position that clears `targetNetApy` on its own; rather than discarding
//! the opportunity outright, this degrades to a coarse open-interest-only
//! liquidity estimate, gated by `maxWorstCaseBreakEvenDays` so a merely-
//! survivable position is never mistaken for a genuinely sized one.

/// `log10(OI/1000)/10`, clamped to `[0, 1]`. Preserves the source's own
/// clamp verbatim (design note §9, "do NOT silently correct"): for
/// `OI < $1,000` the pre-clamp value is negative, or undefined (`NaN`)
/// when `OI <= 0` — both collapse to `0.0` here rather than being
/// special-cased, exactly as the note instructs.
pub(crate) fn log_liquidity_factor(open_interest_usd: f64) -> f64 {
    ((open_interest_usd / 1000.0).log10() / 10.0).clamp(0.0, 1.0)
}

/// True when `open_interest_usd` hits the design note's OI-below-$1k edge
/// case (pre-clamp value negative or `NaN`) — exposed so the caller can
/// log it once, at the point the fallback is actually invoked, without
/// recomputing the raw (unclamped) formula itself.
pub(crate) fn is_degenerate(open_interest_usd: f64) -> bool {
    let raw = (open_interest_usd / 1000.0).log10() / 10.0;
    !raw.is_finite() || raw < 0.0
}

/// Size the fallback position: the OI-derived liquidity factor applied to
/// the same 5%-of-min-OI cap `fra-execution-plan` uses for its own OI
/// gate. Zero when the liquidity factor itself is zero — the caller is
/// expected to treat a zero (or sub-`minPositionUsd`) result as "no
/// viable fallback either", not as a valid worst-case position.
pub(crate) fn worst_case_notional(min_open_interest_usd: f64) -> f64 {
    min_open_interest_usd.max(0.0) * 0.05 * log_liquidity_factor(min_open_interest_usd)
}
