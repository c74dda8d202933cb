//! Next-block base gas prediction (C4, §4.5).
//!
//! Fully deterministic fixed-point integer math — no floats, as required by
//! §4.5 and §8's determinism invariants. The exact weighting between
//! `ALPHA1`/`ALPHA2` and how `SMOOTH_OUT_GAS_INCREASE` interacts with them
//! is flagged in spec.md §9 as something an implementer must verify against
//! observed block headers; this implementation picks a concrete, documented
//! formula (recorded as an Open Question resolution in `DESIGN.md`) rather
//! than leaving the predictor unimplemented.

use serde::{Deserialize, Serialize};

/// Parameters from consensus (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GasParams {
    pub min_base_gas: i64,
    pub target_gas: i64,
    pub smoothing_factor: i64,
    pub alpha1: i64,
    pub alpha2: i64,
    /// Fixed-point, scaled by `scaling_factor`.
    pub u_target: i64,
    pub scaling_factor: i64,
    /// Whether a positive (above-target) deviation is smoothed with a
    /// gentler coefficient than a negative one.
    pub smooth_out_gas_increase: bool,
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            min_base_gas: 1,
            target_gas: 200_000_000,
            smoothing_factor: 8,
            alpha1: 1,
            alpha2: 2,
            u_target: 500_000, // 0.5 scaled by 1_000_000
            scaling_factor: 1_000_000,
            smooth_out_gas_increase: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasState {
    pub ema_next: i64,
    pub base_gas_next: i64,
}

/// `prev_base_gas` defaults to `MIN_BASE_GAS * SCALING_FACTOR` when no
/// previous header exists (§3).
pub fn default_base_gas(params: &GasParams) -> i64 {
    params.min_base_gas.saturating_mul(params.scaling_factor)
}

/// Compute the next block's base gas from the previous EMA/base gas and
/// this block's used gas.
///
/// `utilization = gas_used * scaling_factor / target_gas` (fixed point).
/// `ema_next` smooths `utilization` toward `prev_ema` over
/// `smoothing_factor` blocks. `base_gas_next` moves `prev_base_gas` in the
/// direction of `(ema_next - u_target)`, using `alpha1` when utilization is
/// above target and `alpha2` when below (or the reverse, if
/// `smooth_out_gas_increase` is false — increases are then damped instead
/// of decreases), clamped at `min_base_gas`.
pub fn predict_next_base_gas(
    params: &GasParams,
    prev_base_gas: i64,
    prev_ema: i64,
    gas_used: u64,
) -> GasState {
    let scaling = params.scaling_factor.max(1);
    let target = params.target_gas.max(1);

    let utilization = (gas_used as i64).saturating_mul(scaling) / target;

    let smoothing = params.smoothing_factor.max(1);
    let ema_next =
        (prev_ema.saturating_mul(smoothing - 1) + utilization).saturating_div(smoothing);

    let deviation = ema_next - params.u_target;
    let above_target = deviation > 0;
    let alpha = if above_target == params.smooth_out_gas_increase {
        params.alpha1
    } else {
        params.alpha2
    };

    let adjustment = deviation.saturating_mul(alpha) / scaling;
    let unclamped = prev_base_gas.saturating_add(prev_base_gas.saturating_mul(adjustment) / scaling);

    let min_base_gas_scaled = default_base_gas(params);
    let base_gas_next = unclamped.max(min_base_gas_scaled);

    GasState {
        ema_next,
        base_gas_next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_decays_toward_minimum_but_never_below() {
        let params = GasParams::default();
        let prev_base_gas = default_base_gas(&params) * 10;
        let state = predict_next_base_gas(&params, prev_base_gas, params.u_target, 0);
        assert!(state.base_gas_next >= default_base_gas(&params));
        assert!(state.base_gas_next <= prev_base_gas);
    }

    #[test]
    fn never_goes_below_min_base_gas() {
        let params = GasParams::default();
        let state = predict_next_base_gas(&params, default_base_gas(&params), 0, 0);
        assert_eq!(state.base_gas_next, default_base_gas(&params));
    }

    #[test]
    fn high_utilization_increases_base_gas() {
        let params = GasParams::default();
        let prev_base_gas = default_base_gas(&params) * 5;
        let state = predict_next_base_gas(
            &params,
            prev_base_gas,
            params.u_target,
            params.target_gas as u64 * 2,
        );
        assert!(state.base_gas_next >= prev_base_gas);
    }

    #[test]
    fn is_deterministic() {
        let params = GasParams::default();
        let a = predict_next_base_gas(&params, 1_000_000, 400_000, 50_000_000);
        let b = predict_next_base_gas(&params, 1_000_000, 400_000, 50_000_000);
        assert_eq!(a, b);
    }
}
