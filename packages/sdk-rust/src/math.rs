//! Invariant calculator for Aldrin pools.
//!
//! Two curves are supported:
//!
//! * constant product, `X * Y = (X - A) * (Y + B)`;
//! * stable swap (curve.fi invariant) with amplification
//!   [`AMP`](crate::constants::AMP) over two
//!   coins, solved by Newton iteration.
//!
//! Amounts enter and leave as `u64` on-chain units; every intermediate is an
//! arbitrary-precision [`BigUint`] so products of two reserves never wrap.
//! Outputs round down and required inputs round up, so rounding dust always
//! stays in the pool.
//! No fees are applied here; see [`Fees`](crate::state::Fees).

use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::constants::{LEVERAGE, MAX_NEWTON_ITERATIONS, N_COINS, NEWTON_TOLERANCE, PRICE_PRECISION};
use crate::error::{Error, Result};
use crate::types::{CurveKind, PoolReserves, Side, SwapQuote};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn big(v: u64) -> BigUint {
    BigUint::from(v)
}

fn div_ceil(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    (numerator + denominator - 1u32) / denominator
}

fn to_amount(v: &BigUint) -> Result<u64> {
    v.to_u64().ok_or(Error::MathOverflow)
}

fn almost_equal(a: &BigUint, b: &BigUint) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= big(NEWTON_TOLERANCE)
}

fn check_reserves(reserve_in: u64, reserve_out: u64) -> Result<()> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::EmptyPool);
    }
    Ok(())
}

/// Result of a Newton solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Newton<T> {
    pub value:      T,
    pub iterations: u32,
    /// False when the iteration cap was hit before two successive iterates
    /// came within the tolerance; `value` is then the last iterate.
    pub converged:  bool,
}

/// An amount computed by one of the curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveAmount {
    pub amount:    u64,
    pub converged: bool,
}

// ─── Constant product ─────────────────────────────────────────────────────────

/// Output of spending `amount_in` against a constant-product pool:
/// `A = floor(X * B / (Y + B))` where `X = reserve_out`, `Y = reserve_in`.
pub fn constant_product_out(reserve_in: u64, reserve_out: u64, amount_in: u64) -> Result<u64> {
    check_reserves(reserve_in, reserve_out)?;
    if amount_in == 0 {
        return Err(Error::ZeroAmount);
    }
    let b = big(amount_in);
    let out = big(reserve_out) * &b / (big(reserve_in) + &b);
    to_amount(&out)
}

/// Input required to receive exactly `amount_out`:
/// `B = ceil(X * Y / (X - A)) - Y`.
pub fn constant_product_in(reserve_in: u64, reserve_out: u64, amount_out: u64) -> Result<u64> {
    check_reserves(reserve_in, reserve_out)?;
    if amount_out == 0 {
        return Err(Error::ZeroAmount);
    }
    if amount_out >= reserve_out {
        return Err(Error::InsufficientLiquidity { requested: amount_out, available: reserve_out });
    }
    let x = big(reserve_out);
    let y = big(reserve_in);
    let needed = div_ceil(&(&x * &y), &(&x - big(amount_out)));
    to_amount(&(needed - y))
}

// ─── Stable swap ──────────────────────────────────────────────────────────────

/// `AMP * N_COINS^N_COINS`.
pub fn leverage() -> BigUint {
    big(LEVERAGE)
}

/// One Newton step of the invariant solve:
/// `d = (leverage * S + d_p * n) * d / ((leverage - 1) * d + (n + 1) * d_p)`.
fn d_step(d: &BigUint, leverage: &BigUint, sum_x: &BigUint, d_product: &BigUint) -> BigUint {
    let n = big(N_COINS);
    let numerator = (leverage * sum_x + d_product * &n) * d;
    let denominator = (leverage - 1u32) * d + (n + 1u32) * d_product;
    numerator / denominator
}

/// Stable-swap invariant `D` of a two-coin pool.
///
/// Starts from `D = a + b` and iterates until two successive values differ by
/// at most one unit, or [`MAX_NEWTON_ITERATIONS`] steps have run. An empty
/// pool has `D = 0`.
pub fn compute_d(amount_a: &BigUint, amount_b: &BigUint) -> Result<Newton<BigUint>> {
    let sum_x = amount_a + amount_b;
    if sum_x.is_zero() {
        return Ok(Newton { value: sum_x, iterations: 0, converged: true });
    }
    if amount_a.is_zero() || amount_b.is_zero() {
        return Err(Error::EmptyPool);
    }

    let leverage = leverage();
    let a_times_n = amount_a * N_COINS;
    let b_times_n = amount_b * N_COINS;

    let mut d = sum_x.clone();
    for iteration in 1..=MAX_NEWTON_ITERATIONS {
        let d_product = &d * &d / &a_times_n * &d / &b_times_n;
        let next = d_step(&d, &leverage, &sum_x, &d_product);
        let done = almost_equal(&d, &next);
        d = next;
        if done {
            debug!("stable invariant converged after {iteration} iterations: D = {d}");
            return Ok(Newton { value: d, iterations: iteration, converged: true });
        }
    }

    warn!("stable invariant did not converge in {MAX_NEWTON_ITERATIONS} iterations (a = {amount_a}, b = {amount_b})");
    Ok(Newton { value: d, iterations: MAX_NEWTON_ITERATIONS, converged: false })
}

/// Balance of the other coin once one side holds `new_source`, keeping `d`.
///
/// Solves `y^2 + b*y = c` by Newton iteration from `y = d`, with
/// `c = d^3 / (4 * new_source * leverage)` and `b = new_source + d / leverage`.
pub fn new_destination_amount(new_source: &BigUint, d: &BigUint) -> Result<Newton<BigUint>> {
    if new_source.is_zero() {
        return Err(Error::EmptyPool);
    }
    let leverage = leverage();
    let c = d.pow(N_COINS as u32 + 1) / (new_source * (N_COINS * N_COINS) * &leverage);
    let b = new_source + d / &leverage;

    let mut y = d.clone();
    for iteration in 1..=MAX_NEWTON_ITERATIONS {
        let shifted = &y * 2u32 + &b;
        if shifted <= *d {
            return Err(Error::Degenerate("non-positive denominator in destination solve"));
        }
        let next = (&y * &y + &c) / (shifted - d);
        let done = almost_equal(&y, &next);
        y = next;
        if done {
            debug!("stable destination converged after {iteration} iterations: y = {y}");
            return Ok(Newton { value: y, iterations: iteration, converged: true });
        }
    }

    warn!("stable destination did not converge in {MAX_NEWTON_ITERATIONS} iterations (source = {new_source}, D = {d})");
    Ok(Newton { value: y, iterations: MAX_NEWTON_ITERATIONS, converged: false })
}

/// Output of spending `amount_in` against a stable-swap pool.
pub fn stable_swap_out(reserve_in: u64, reserve_out: u64, amount_in: u64) -> Result<CurveAmount> {
    check_reserves(reserve_in, reserve_out)?;
    if amount_in == 0 {
        return Err(Error::ZeroAmount);
    }
    let d = compute_d(&big(reserve_in), &big(reserve_out))?;
    let y = new_destination_amount(&(big(reserve_in) + big(amount_in)), &d.value)?;
    // y is truncated by the solve, so one unit is held back for the pool.
    let kept = &y.value + 1u32;
    let reserve_out = big(reserve_out);
    let amount = if kept >= reserve_out { BigUint::zero() } else { reserve_out - kept };
    Ok(CurveAmount { amount: to_amount(&amount)?, converged: d.converged && y.converged })
}

/// Input required to receive exactly `amount_out` from a stable-swap pool.
///
/// Solves the same invariant with the roles of the two coins swapped and
/// charges one extra unit to cover the truncated solve.
pub fn stable_swap_in(reserve_in: u64, reserve_out: u64, amount_out: u64) -> Result<CurveAmount> {
    check_reserves(reserve_in, reserve_out)?;
    if amount_out == 0 {
        return Err(Error::ZeroAmount);
    }
    if amount_out >= reserve_out {
        return Err(Error::InsufficientLiquidity { requested: amount_out, available: reserve_out });
    }
    let d = compute_d(&big(reserve_in), &big(reserve_out))?;
    let x = new_destination_amount(&big(reserve_out - amount_out), &d.value)?;
    let reserve_in = big(reserve_in);
    let amount = if x.value < reserve_in { BigUint::zero() } else { &x.value - reserve_in + 1u32 };
    Ok(CurveAmount { amount: to_amount(&amount)?, converged: d.converged && x.converged })
}

// ─── Quotes ───────────────────────────────────────────────────────────────────

/// Tokens received for spending exactly `amount_in` on `side`.
pub fn quote_exact_in(pool: &PoolReserves, side: Side, amount_in: u64) -> Result<SwapQuote> {
    let (reserve_in, reserve_out) = pool.directional(side);
    let out = match pool.curve {
        CurveKind::ConstantProduct => CurveAmount {
            amount:    constant_product_out(reserve_in, reserve_out, amount_in)?,
            converged: true,
        },
        CurveKind::StableSwap => stable_swap_out(reserve_in, reserve_out, amount_in)?,
    };
    Ok(SwapQuote {
        side,
        curve: pool.curve,
        amount_in,
        amount_out: out.amount,
        converged: out.converged,
    })
}

/// Tokens to spend on `side` to receive exactly `amount_out`.
pub fn quote_exact_out(pool: &PoolReserves, side: Side, amount_out: u64) -> Result<SwapQuote> {
    let (reserve_in, reserve_out) = pool.directional(side);
    let input = match pool.curve {
        CurveKind::ConstantProduct => CurveAmount {
            amount:    constant_product_in(reserve_in, reserve_out, amount_out)?,
            converged: true,
        },
        CurveKind::StableSwap => stable_swap_in(reserve_in, reserve_out, amount_out)?,
    };
    Ok(SwapQuote {
        side,
        curve: pool.curve,
        amount_in: input.amount,
        amount_out,
        converged: input.converged,
    })
}

// ─── Price ────────────────────────────────────────────────────────────────────

/// Price of one whole base token in whole quote tokens, at
/// [`PRICE_PRECISION`] resolution.
///
/// Constant-product pools use the reserve ratio. Stable pools are priced by
/// probing a swap of half the quote reserve, since their marginal price is
/// not the reserve ratio.
pub fn spot_price(pool: &PoolReserves, base_decimals: u8, quote_decimals: u8) -> Result<f64> {
    check_reserves(pool.base_reserve, pool.quote_reserve)?;
    let (quote_amount, base_amount) = match pool.curve {
        CurveKind::ConstantProduct => (pool.quote_reserve, pool.base_reserve),
        CurveKind::StableSwap => {
            let probe = (pool.quote_reserve / 2).max(1);
            let out = stable_swap_out(pool.quote_reserve, pool.base_reserve, probe)?;
            if out.amount == 0 {
                return Err(Error::Degenerate("stable price probe returned nothing"));
            }
            (probe, out.amount)
        }
    };

    let scaled = big(quote_amount) * PRICE_PRECISION * BigUint::from(10u32).pow(base_decimals as u32)
        / BigUint::from(10u32).pow(quote_decimals as u32)
        / big(base_amount);
    let scaled = scaled.to_f64().ok_or(Error::MathOverflow)?;
    Ok(scaled / PRICE_PRECISION as f64)
}

/// Amounts for a balanced deposit given one side's limit.
///
/// Whichever limit is missing is derived from the pool price at
/// [`PRICE_PRECISION`]; returns `(max_base, max_quote)`.
pub fn deposit_amounts(pool: &PoolReserves, max_base: Option<u64>, max_quote: Option<u64>) -> Result<(u64, u64)> {
    check_reserves(pool.base_reserve, pool.quote_reserve)?;
    let price = big(pool.quote_reserve) * PRICE_PRECISION / big(pool.base_reserve);
    match (max_base, max_quote) {
        (Some(base), Some(quote)) => Ok((base, quote)),
        (Some(base), None) => Ok((base, to_amount(&(big(base) * &price / PRICE_PRECISION))?)),
        (None, Some(quote)) => {
            if price.is_zero() {
                return Err(Error::Degenerate("pool price rounds to zero"));
            }
            Ok((to_amount(&(big(quote) * PRICE_PRECISION / &price))?, quote))
        }
        (None, None) => Err(Error::ZeroAmount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_product_known_values() {
        // X = 1_000_000 base, Y = 2_000_000_000 quote, B = 5_000_000 quote in.
        // Exact output is 2493.77; the fraction stays in the pool.
        assert_eq!(constant_product_out(2_000_000_000, 1_000_000, 5_000_000).unwrap(), 2_493);
        // 2e15 / 997_507 = 2_004_998_461.2, rounded up.
        assert_eq!(constant_product_in(2_000_000_000, 1_000_000, 2_493).unwrap(), 4_998_462);
    }

    #[test]
    fn tiny_trades_round_to_nothing() {
        assert_eq!(constant_product_out(2_000_000_000, 1_000_000, 1_000).unwrap(), 0);
        // Even one unit out costs a full price's worth of input.
        assert_eq!(constant_product_in(2_000_000_000, 1_000_000, 1).unwrap(), 2_001);
    }

    #[test]
    fn inverse_never_asks_more_than_forward_spent() {
        let (y, x) = (2_000_000_000u64, 1_000_000u64);
        for b in [1_000u64, 77_777, 5_000_000, 123_456_789] {
            let a = constant_product_out(y, x, b).unwrap();
            if a == 0 {
                continue;
            }
            let b_back = constant_product_in(y, x, a).unwrap();
            assert!(b_back <= b, "b = {b}, a = {a}, b' = {b_back}");
            assert_eq!(constant_product_out(y, x, b_back).unwrap(), a);
        }
    }

    #[test]
    fn constant_product_is_monotone_and_bounded() {
        let mut last = 0;
        for b in [1u64, 10, 1_000, 100_000, 10_000_000, 1_000_000_000, u64::MAX] {
            let a = constant_product_out(500_000, 700_000, b).unwrap();
            assert!(a >= last);
            assert!(a <= 700_000);
            last = a;
        }
        assert!(constant_product_out(500_000, 700_000, 1_000_000).unwrap() < 700_000);
    }

    #[test]
    fn constant_product_rejects_bad_inputs() {
        assert!(matches!(constant_product_out(0, 10, 1), Err(Error::EmptyPool)));
        assert!(matches!(constant_product_out(10, 0, 1), Err(Error::EmptyPool)));
        assert!(matches!(constant_product_out(10, 10, 0), Err(Error::ZeroAmount)));
        assert!(matches!(
            constant_product_in(10, 10, 10),
            Err(Error::InsufficientLiquidity { requested: 10, available: 10 })
        ));
    }

    #[test]
    fn balanced_pool_invariant_is_the_sum() {
        let d = compute_d(&big(1_000_000), &big(1_000_000)).unwrap();
        assert!(d.converged);
        assert!(d.iterations <= 2);
        assert!(almost_equal(&d.value, &big(2_000_000)));
    }

    #[test]
    fn empty_pool_invariant_is_zero() {
        let d = compute_d(&BigUint::zero(), &BigUint::zero()).unwrap();
        assert_eq!(d.value, BigUint::zero());
        assert!(matches!(compute_d(&big(5), &BigUint::zero()), Err(Error::EmptyPool)));
    }

    #[test]
    fn imbalanced_invariant_sits_below_the_sum() {
        let d = compute_d(&big(1_000_000), &big(3_000_000)).unwrap();
        assert!(d.converged);
        assert!(d.value < big(4_000_000));
        assert!(d.value > big(3_900_000));
    }

    #[test]
    fn stable_swap_is_near_parity() {
        let out = stable_swap_out(1_000_000_000, 1_000_000_000, 1_000_000).unwrap();
        assert!(out.converged);
        assert!(out.amount <= 1_000_000);
        assert!(out.amount > 999_000, "got {}", out.amount);

        // Far flatter than the constant-product curve for the same trade.
        let cp = constant_product_out(1_000_000_000, 1_000_000_000, 100_000_000).unwrap();
        let ss = stable_swap_out(1_000_000_000, 1_000_000_000, 100_000_000).unwrap().amount;
        assert!(ss > cp);
        assert!(ss < 1_000_000_000);
    }

    #[test]
    fn stable_output_holds_back_the_truncated_unit() {
        let reserve = big(1_000_000_000);
        let d = compute_d(&reserve, &reserve).unwrap();
        let y = new_destination_amount(&(&reserve + big(1_000_000)), &d.value).unwrap();
        let out = stable_swap_out(1_000_000_000, 1_000_000_000, 1_000_000).unwrap();
        assert_eq!(big(out.amount), reserve - y.value - 1u32);
        assert_eq!(out.amount, 999_993);
    }

    #[test]
    fn lopsided_pool_hits_the_iteration_cap() {
        let d = compute_d(&big(1), &big(u64::MAX)).unwrap();
        assert!(!d.converged);
        assert_eq!(d.iterations, MAX_NEWTON_ITERATIONS);

        let out = stable_swap_out(1, u64::MAX, 1_000).unwrap();
        assert!(!out.converged);

        let pool = PoolReserves::new(u64::MAX, 1, CurveKind::StableSwap);
        let quote = quote_exact_in(&pool, Side::Bid, 1_000).unwrap();
        assert!(!quote.converged);
    }

    #[test]
    fn stable_exact_out_covers_the_request() {
        let needed = stable_swap_in(1_000_000_000, 1_000_000_000, 1_000_000).unwrap();
        assert!(needed.converged);
        assert_eq!(needed.amount, 1_000_007);
        // Spending what was asked for buys at least the requested amount.
        let got = stable_swap_out(1_000_000_000, 1_000_000_000, needed.amount).unwrap();
        assert!(got.amount >= 1_000_000, "got {}", got.amount);
        assert!(matches!(
            stable_swap_in(100, 100, 100),
            Err(Error::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn quote_maps_side_to_reserves() {
        let pool = PoolReserves::new(1_000_000, 2_000_000_000, CurveKind::ConstantProduct);

        let bid = quote_exact_in(&pool, Side::Bid, 5_000_000).unwrap();
        assert_eq!(bid.amount_out, 2_493);
        assert!(bid.converged);

        let ask = quote_exact_in(&pool, Side::Ask, 2_493).unwrap();
        assert_eq!(ask.amount_out, 4_973_600);

        let exact = quote_exact_out(&pool, Side::Bid, 2_493).unwrap();
        assert_eq!(exact.amount_in, 4_998_462);
        assert_eq!(exact.amount_out, 2_493);
    }

    #[test]
    fn constant_product_price_uses_decimals() {
        // 10 base (9 decimals) against 1_500 quote (6 decimals).
        let pool = PoolReserves::new(10_000_000_000, 1_500_000_000, CurveKind::ConstantProduct);
        let price = spot_price(&pool, 9, 6).unwrap();
        assert!((price - 150.0).abs() < 1e-9, "got {price}");
    }

    #[test]
    fn stable_price_is_close_to_one() {
        let pool = PoolReserves::new(1_000_000_000, 1_000_000_000, CurveKind::StableSwap);
        let price = spot_price(&pool, 6, 6).unwrap();
        assert!(price >= 1.0 && price < 1.01, "got {price}");
    }

    #[test]
    fn deposit_derives_missing_side() {
        let pool = PoolReserves::new(1_000, 4_000, CurveKind::ConstantProduct);
        assert_eq!(deposit_amounts(&pool, Some(10), None).unwrap(), (10, 40));
        assert_eq!(deposit_amounts(&pool, None, Some(40)).unwrap(), (10, 40));
        assert!(matches!(deposit_amounts(&pool, None, None), Err(Error::ZeroAmount)));
    }
}
