//! CPMM Calculator
//!
//! Swap math using constant product formula (yes * no = k) and the
//! read-only views derived from it. Integer arithmetic throughout; every
//! division floors, so rounding always favours the pool.

use corner_core::constants::BPS_DENOMINATOR;
use corner_core::{Amount, OddsConvention};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::state::{Percentage, Pool, Side};

/// Calculate swap output using constant product formula
///
/// Formula: output = floor(reserve_out * input / (reserve_in + input))
pub fn calculate_output(reserve_in: Amount, reserve_out: Amount, input_amount: Amount) -> Amount {
    if reserve_in == 0 || reserve_out == 0 || input_amount == 0 {
        return 0;
    }

    let numerator = BigUint::from(reserve_out) * BigUint::from(input_amount);
    let denominator = BigUint::from(reserve_in) + BigUint::from(input_amount);

    // output < reserve_out, so it always fits
    (numerator / denominator).to_u64().unwrap_or(0)
}

/// Reserves `(in, out)` when selling `side_in` to the pool
pub fn reserves_for(pool: &Pool, side_in: Side) -> (Amount, Amount) {
    (pool.balance(side_in), pool.balance(side_in.opposite()))
}

/// Preview of a swap selling `side_in`. Does not touch the pool.
pub fn estimate_swap_output(pool: &Pool, side_in: Side, amount_in: Amount) -> Amount {
    let (reserve_in, reserve_out) = reserves_for(pool, side_in);
    calculate_output(reserve_in, reserve_out, amount_in)
}

/// Implied YES probability under the default (price) convention
pub fn implied_yes_odds(pool: &Pool) -> Percentage {
    implied_yes_odds_with(pool, OddsConvention::Price)
}

/// Implied NO probability under the default (price) convention
pub fn implied_no_odds(pool: &Pool) -> Percentage {
    implied_yes_odds(pool).complement()
}

/// Implied YES probability.
///
/// `Price` reads the marginal price of YES: `no / (yes + no)`. A pool heavy
/// in YES inventory sells YES cheaply, so the odds drop.
/// `InventoryShare` reads `yes / (yes + no)`.
/// Either balance at zero means no price yet: 50%.
pub fn implied_yes_odds_with(pool: &Pool, convention: OddsConvention) -> Percentage {
    if !pool.is_seeded() {
        return Percentage::EVEN;
    }

    let numerator = match convention {
        OddsConvention::Price => pool.no_balance(),
        OddsConvention::InventoryShare => pool.yes_balance(),
    };
    let total = pool.yes_balance() as u128 + pool.no_balance() as u128;
    let bps = numerator as u128 * BPS_DENOMINATOR as u128 / total;

    Percentage::from_bps(bps as u32)
}

/// Apply slippage tolerance (basis points) to an expected output
pub fn suggest_min_out(expected: Amount, slippage_bps: u32) -> Amount {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps) as u128;
    (expected as u128 * keep / BPS_DENOMINATOR as u128) as Amount
}

/// Price impact in basis points: how far the execution rate falls short of
/// the spot rate `reserve_out / reserve_in`.
pub fn calculate_price_impact_bps(
    reserve_in: Amount,
    reserve_out: Amount,
    input_amount: Amount,
    output_amount: Amount,
) -> u32 {
    if reserve_in == 0 || reserve_out == 0 || input_amount == 0 {
        return 0;
    }

    // execution / spot = (output * reserve_in) / (input * reserve_out)
    let ratio_bps = BigUint::from(output_amount)
        * BigUint::from(reserve_in)
        * BigUint::from(BPS_DENOMINATOR)
        / (BigUint::from(input_amount) * BigUint::from(reserve_out));

    let ratio_bps = ratio_bps.to_u32().unwrap_or(BPS_DENOMINATOR);
    BPS_DENOMINATOR.saturating_sub(ratio_bps)
}

/// Swap quote with calculated values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub side_in: Side,
    pub amount_in: Amount,
    /// Expected output of the opposite side
    pub amount_out: Amount,
    /// Suggested guard with the requested slippage
    pub min_out: Amount,
    pub price_impact_bps: u32,
    /// Implied YES odds after the swap (price convention)
    pub yes_odds_after: Percentage,
}

/// Calculate a swap quote for the given pool and input
pub fn quote_swap(
    pool: &Pool,
    side_in: Side,
    amount_in: Amount,
    slippage_bps: u32,
) -> Option<SwapQuote> {
    if !pool.is_seeded() {
        return None;
    }

    let (reserve_in, reserve_out) = reserves_for(pool, side_in);
    let amount_out = calculate_output(reserve_in, reserve_out, amount_in);
    if amount_out == 0 {
        return None;
    }

    let new_in = reserve_in.checked_add(amount_in)?;
    let new_out = reserve_out - amount_out;
    let after = match side_in {
        Side::Yes => pool.with_balances(new_in, new_out),
        Side::No => pool.with_balances(new_out, new_in),
    };

    Some(SwapQuote {
        side_in,
        amount_in,
        amount_out,
        min_out: suggest_min_out(amount_out, slippage_bps),
        price_impact_bps: calculate_price_impact_bps(reserve_in, reserve_out, amount_in, amount_out),
        yes_odds_after: implied_yes_odds(&after),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use corner_core::MarketId;

    const UNIT: Amount = 1_000_000_000;

    fn pool(yes: Amount, no: Amount) -> Pool {
        Pool::from_parts(
            MarketId::new("m"),
            yes,
            no,
            yes as u128 * no as u128,
            yes + no,
        )
    }

    #[test]
    fn test_calculate_output_floors() {
        // floor(50e9 * 10e9 / 60e9) = 8_333_333_333
        assert_eq!(
            calculate_output(50 * UNIT, 50 * UNIT, 10 * UNIT),
            8_333_333_333
        );
        // 10 * 3 / 4 = 7.5 -> 7
        assert_eq!(calculate_output(1, 10, 3), 7);
    }

    #[test]
    fn test_calculate_output_zero_inputs() {
        assert_eq!(calculate_output(0, 100, 10), 0);
        assert_eq!(calculate_output(100, 0, 10), 0);
        assert_eq!(calculate_output(100, 100, 0), 0);
    }

    #[test]
    fn test_calculate_output_large_values() {
        let out = calculate_output(u64::MAX / 2, u64::MAX / 2, u64::MAX / 2);
        assert_eq!(out, u64::MAX / 4);
    }

    #[test]
    fn test_estimate_swap_output_sides() {
        let p = pool(40 * UNIT, 60 * UNIT);
        assert_eq!(
            estimate_swap_output(&p, Side::Yes, UNIT),
            calculate_output(40 * UNIT, 60 * UNIT, UNIT)
        );
        assert_eq!(
            estimate_swap_output(&p, Side::No, UNIT),
            calculate_output(60 * UNIT, 40 * UNIT, UNIT)
        );
    }

    #[test]
    fn test_implied_odds_empty_pool_is_even() {
        let p = pool(0, 0);
        assert_eq!(implied_yes_odds(&p), Percentage::EVEN);
        assert_eq!(implied_no_odds(&p), Percentage::EVEN);

        let p = pool(10, 0);
        assert_eq!(
            implied_yes_odds_with(&p, OddsConvention::InventoryShare),
            Percentage::EVEN
        );
    }

    #[test]
    fn test_implied_odds_conventions() {
        // 60 YES, 40 NO in the pool: YES is cheap
        let p = pool(60 * UNIT, 40 * UNIT);
        assert_eq!(implied_yes_odds(&p).bps(), 4_000);
        assert_eq!(implied_no_odds(&p).bps(), 6_000);
        assert_eq!(
            implied_yes_odds_with(&p, OddsConvention::InventoryShare).bps(),
            6_000
        );
    }

    #[test]
    fn test_implied_odds_two_decimals_floor() {
        // no / total = 1 / 3 = 33.333..% -> 33.33%
        let p = pool(2 * UNIT, UNIT);
        assert_eq!(implied_yes_odds(&p).to_string(), "33.33%");
        assert_eq!(implied_no_odds(&p).to_string(), "66.67%");
    }

    #[test]
    fn test_suggest_min_out() {
        assert_eq!(suggest_min_out(8_333_333_333, 100), 8_249_999_999);
        assert_eq!(suggest_min_out(1000, 0), 1000);
        assert_eq!(suggest_min_out(1000, 20_000), 0);
    }

    #[test]
    fn test_price_impact() {
        // Spot 1:1, execution 0.8333 -> 16.67% impact, floored ratio -> 1667 bps
        let impact = calculate_price_impact_bps(50 * UNIT, 50 * UNIT, 10 * UNIT, 8_333_333_333);
        assert_eq!(impact, 1_667);
        assert_eq!(calculate_price_impact_bps(0, 1, 1, 1), 0);
    }

    #[test]
    fn test_quote_swap() {
        let p = pool(50 * UNIT, 50 * UNIT);
        let quote = quote_swap(&p, Side::Yes, 10 * UNIT, 100).unwrap();

        assert_eq!(quote.amount_out, 8_333_333_333);
        assert!(quote.min_out < quote.amount_out);
        assert!(quote.price_impact_bps > 0);
        // Selling YES makes YES cheaper
        assert!(quote.yes_odds_after < implied_yes_odds(&p));
    }

    #[test]
    fn test_quote_swap_unseeded_or_dust() {
        assert!(quote_swap(&pool(0, 0), Side::Yes, UNIT, 100).is_none());
        // 1 * 1 / (1000 + 1) rounds to zero
        assert!(quote_swap(&pool(1000, 1), Side::Yes, 1, 100).is_none());
    }
}
