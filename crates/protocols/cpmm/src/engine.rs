//! CPMM Engine
//!
//! Pure `(Pool, inputs) -> (Pool, outputs)` transitions. Nothing here
//! performs I/O or mutates its input, so every function is safe to re-run
//! when a ledger transaction is retried. All preconditions are checked
//! before the new pool is built.

use corner_core::Amount;

use crate::calculator::calculate_output;
use crate::state::{CpmmError, MarketStatus, Pool, Side};

/// Lock `usdo_in` collateral and mint a YES/NO pair.
///
/// On an unseeded pool half of the deposit becomes liquidity on each side
/// and the caller receives that same half as their first position. On a
/// seeded pool the balances are untouched and the caller receives the full
/// face-value pair.
///
/// Returns `(new_pool, yes_out, no_out)`.
pub fn split(pool: &Pool, usdo_in: Amount) -> Result<(Pool, Amount, Amount), CpmmError> {
    if usdo_in == 0 {
        return Err(CpmmError::InsufficientLiquidity);
    }

    let collateral = pool
        .collateral()
        .checked_add(usdo_in)
        .ok_or(CpmmError::AmountOverflow)?;

    if !pool.is_seeded() {
        let liquidity = usdo_in / 2;
        if liquidity == 0 {
            return Err(CpmmError::InsufficientLiquidity);
        }

        let yes_balance = pool
            .yes_balance()
            .checked_add(liquidity)
            .ok_or(CpmmError::AmountOverflow)?;
        let no_balance = pool
            .no_balance()
            .checked_add(liquidity)
            .ok_or(CpmmError::AmountOverflow)?;

        let next = pool
            .with_balances(yes_balance, no_balance)
            .with_collateral(collateral);
        return Ok((next, liquidity, liquidity));
    }

    Ok((pool.with_collateral(collateral), usdo_in, usdo_in))
}

/// Sell YES to the pool for NO. Returns `(new_pool, no_out)`.
pub fn swap_yes_for_no(
    pool: &Pool,
    yes_in: Amount,
    min_no_out: Amount,
) -> Result<(Pool, Amount), CpmmError> {
    swap(pool, Side::Yes, yes_in, min_no_out)
}

/// Sell NO to the pool for YES. Returns `(new_pool, yes_out)`.
pub fn swap_no_for_yes(
    pool: &Pool,
    no_in: Amount,
    min_yes_out: Amount,
) -> Result<(Pool, Amount), CpmmError> {
    swap(pool, Side::No, no_in, min_yes_out)
}

/// Constant-product swap selling `side_in`.
///
/// `out = floor(reserve_out * amount_in / (reserve_in + amount_in))`, so
/// `out < reserve_out` always holds and `k` never decreases.
pub fn swap(
    pool: &Pool,
    side_in: Side,
    amount_in: Amount,
    min_out: Amount,
) -> Result<(Pool, Amount), CpmmError> {
    if !pool.is_seeded() {
        return Err(CpmmError::InsufficientLiquidity);
    }
    if amount_in == 0 {
        return Err(CpmmError::invalid_amount("swap input must be positive"));
    }

    let reserve_in = pool.balance(side_in);
    let reserve_out = pool.balance(side_in.opposite());

    let new_in = reserve_in
        .checked_add(amount_in)
        .ok_or(CpmmError::AmountOverflow)?;

    let amount_out = calculate_output(reserve_in, reserve_out, amount_in);
    if amount_out == 0 {
        return Err(CpmmError::invalid_amount("swap output rounds to zero"));
    }
    if amount_out < min_out {
        return Err(CpmmError::SlippageExceeded {
            got: amount_out,
            min: min_out,
        });
    }
    if amount_out >= reserve_out {
        return Err(CpmmError::InsufficientLiquidity);
    }

    let new_out = reserve_out - amount_out;
    let next = match side_in {
        Side::Yes => pool.with_balances(new_in, new_out),
        Side::No => pool.with_balances(new_out, new_in),
    };

    Ok((next, amount_out))
}

/// Burn a balanced pair back into collateral. Pool balances are untouched.
/// Returns `(new_pool, usdo_out)`.
pub fn join(pool: &Pool, yes_in: Amount, no_in: Amount) -> Result<(Pool, Amount), CpmmError> {
    if yes_in != no_in {
        return Err(CpmmError::UnbalancedPair { yes_in, no_in });
    }
    if yes_in == 0 {
        return Err(CpmmError::invalid_amount("join amount must be positive"));
    }

    release_collateral(pool, yes_in)
}

/// Burn winning-side tokens for collateral after resolution.
/// Returns `(new_pool, usdo_out)`.
pub fn redeem(
    pool: &Pool,
    side: Side,
    amount: Amount,
    market: &MarketStatus,
) -> Result<(Pool, Amount), CpmmError> {
    let winning = market.winning_side().ok_or(CpmmError::MarketNotResolved)?;
    if side != winning {
        return Err(CpmmError::WrongSide {
            requested: side,
            winning,
        });
    }
    if amount == 0 {
        return Err(CpmmError::invalid_amount("redeem amount must be positive"));
    }

    release_collateral(pool, amount)
}

fn release_collateral(pool: &Pool, usdo_out: Amount) -> Result<(Pool, Amount), CpmmError> {
    if usdo_out > pool.collateral() {
        return Err(CpmmError::InsufficientCollateral {
            requested: usdo_out,
            available: pool.collateral(),
        });
    }
    Ok((pool.with_collateral(pool.collateral() - usdo_out), usdo_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use corner_core::MarketId;

    const UNIT: Amount = 1_000_000_000;

    fn empty() -> Pool {
        Pool::new(MarketId::new("m"))
    }

    fn seeded() -> Pool {
        split(&empty(), 100 * UNIT).unwrap().0
    }

    #[test]
    fn test_seeding_split() {
        let (pool, yes_out, no_out) = split(&empty(), 100_000_000_000).unwrap();

        assert_eq!(yes_out, 50_000_000_000);
        assert_eq!(no_out, 50_000_000_000);
        assert_eq!(pool.yes_balance(), 50_000_000_000);
        assert_eq!(pool.no_balance(), 50_000_000_000);
        assert_eq!(pool.k(), 2_500_000_000_000_000_000_000);
        assert_eq!(pool.collateral(), 100_000_000_000);
    }

    #[test]
    fn test_seeding_split_odd_amount_keeps_full_collateral() {
        let (pool, yes_out, _) = split(&empty(), 7).unwrap();
        assert_eq!(yes_out, 3);
        assert_eq!(pool.yes_balance(), 3);
        assert_eq!(pool.collateral(), 7);
    }

    #[test]
    fn test_split_degenerate_amounts() {
        assert_eq!(split(&empty(), 0), Err(CpmmError::InsufficientLiquidity));
        assert_eq!(split(&empty(), 1), Err(CpmmError::InsufficientLiquidity));
        assert_eq!(split(&seeded(), 0), Err(CpmmError::InsufficientLiquidity));
    }

    #[test]
    fn test_split_after_seed_issues_full_pair() {
        let before = seeded();
        let (after, yes_out, no_out) = split(&before, 25 * UNIT).unwrap();

        assert_eq!(yes_out, 25 * UNIT);
        assert_eq!(no_out, 25 * UNIT);
        assert_eq!(after.yes_balance(), before.yes_balance());
        assert_eq!(after.no_balance(), before.no_balance());
        assert_eq!(after.k(), before.k());
        assert_eq!(after.collateral(), before.collateral() + 25 * UNIT);
    }

    #[test]
    fn test_split_collateral_overflow() {
        let pool = Pool::from_parts(MarketId::new("m"), 1, 1, 1, u64::MAX);
        assert_eq!(split(&pool, 1), Err(CpmmError::AmountOverflow));
    }

    #[test]
    fn test_swap_yes_for_no_exact() {
        let pool = seeded();
        let (after, no_out) = swap_yes_for_no(&pool, 10 * UNIT, 0).unwrap();

        assert_eq!(no_out, 8_333_333_333);
        assert_eq!(after.yes_balance(), 60 * UNIT);
        assert_eq!(after.no_balance(), 50 * UNIT - 8_333_333_333);
        assert_eq!(after.k(), after.product());
        assert_eq!(after.collateral(), pool.collateral());
    }

    #[test]
    fn test_swap_no_for_yes_mirrors() {
        let pool = seeded();
        let (after, yes_out) = swap_no_for_yes(&pool, 10 * UNIT, 0).unwrap();

        assert_eq!(yes_out, 8_333_333_333);
        assert_eq!(after.no_balance(), 60 * UNIT);
        assert_eq!(after.yes_balance(), 50 * UNIT - 8_333_333_333);
    }

    #[test]
    fn test_slippage_guard() {
        let pool = seeded();
        assert_eq!(
            swap_yes_for_no(&pool, 10 * UNIT, 9 * UNIT),
            Err(CpmmError::SlippageExceeded {
                got: 8_333_333_333,
                min: 9 * UNIT
            })
        );
        assert!(swap_yes_for_no(&pool, 10 * UNIT, 8 * UNIT).is_ok());
        // Guard equal to the output passes
        assert!(swap_yes_for_no(&pool, 10 * UNIT, 8_333_333_333).is_ok());
    }

    #[test]
    fn test_swap_requires_seeded_pool() {
        assert_eq!(
            swap_yes_for_no(&empty(), UNIT, 0),
            Err(CpmmError::InsufficientLiquidity)
        );
        let half = Pool::from_parts(MarketId::new("m"), UNIT, 0, 0, UNIT);
        assert_eq!(
            swap_no_for_yes(&half, UNIT, 0),
            Err(CpmmError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_swap_rejects_zero_and_dust() {
        let pool = seeded();
        assert!(matches!(
            swap_yes_for_no(&pool, 0, 0),
            Err(CpmmError::InvalidAmount { .. })
        ));
        // 1 base unit against 50e9 reserves floors to zero
        assert!(matches!(
            swap_yes_for_no(&pool, 1, 0),
            Err(CpmmError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_swap_input_overflow() {
        let pool = Pool::from_parts(MarketId::new("m"), u64::MAX - 1, 10, 0, 0);
        assert_eq!(
            swap_yes_for_no(&pool, 2, 0),
            Err(CpmmError::AmountOverflow)
        );
    }

    #[test]
    fn test_swap_never_decreases_k() {
        let mut pool = seeded();
        let inputs = [1_234_567u64, 3 * UNIT, 17, 999_999_999_999, 42 * UNIT + 7, 5];
        for (i, amount) in inputs.iter().cycle().take(60).enumerate() {
            let side = if i % 3 == 0 { Side::No } else { Side::Yes };
            let k_before = pool.product();
            match swap(&pool, side, *amount, 0) {
                Ok((next, out)) => {
                    assert!(next.product() >= k_before);
                    assert!(out < pool.balance(side.opposite()));
                    assert!(next.yes_balance() > 0 && next.no_balance() > 0);
                    pool = next;
                }
                Err(CpmmError::InvalidAmount { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn test_swap_floor_rounding_grows_k() {
        let pool = seeded();
        let (after, _) = swap_yes_for_no(&pool, 10 * UNIT, 0).unwrap();
        // 60e9 * 41_666_666_667 > 2.5e21
        assert!(after.k() > pool.k());
    }

    #[test]
    fn test_swap_monotonic_and_never_drains() {
        let pool = seeded();
        let mut last = 0;
        for exp in 0..10 {
            let amount = UNIT * 10u64.pow(exp);
            let (_, out) = swap_yes_for_no(&pool, amount, 0).unwrap();
            assert!(out > last);
            assert!(out < pool.no_balance());
            last = out;
        }
    }

    #[test]
    fn test_split_join_round_trip() {
        let pool = seeded();
        let (after_split, yes_out, no_out) = split(&pool, 12_345 * UNIT).unwrap();
        let (after_join, usdo_out) = join(&after_split, yes_out, no_out).unwrap();

        assert_eq!(usdo_out, 12_345 * UNIT);
        assert_eq!(after_join, pool);
    }

    #[test]
    fn test_join_unbalanced() {
        assert_eq!(
            join(&seeded(), 2, 3),
            Err(CpmmError::UnbalancedPair { yes_in: 2, no_in: 3 })
        );
    }

    #[test]
    fn test_join_zero() {
        assert!(matches!(
            join(&seeded(), 0, 0),
            Err(CpmmError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_join_more_than_collateral() {
        let pool = seeded();
        assert_eq!(
            join(&pool, 101 * UNIT, 101 * UNIT),
            Err(CpmmError::InsufficientCollateral {
                requested: 101 * UNIT,
                available: 100 * UNIT
            })
        );
    }

    #[test]
    fn test_redeem_requires_resolution() {
        assert_eq!(
            redeem(&seeded(), Side::Yes, UNIT, &MarketStatus::Open),
            Err(CpmmError::MarketNotResolved)
        );
    }

    #[test]
    fn test_redeem_winning_side() {
        let pool = seeded();
        let resolved = MarketStatus::Resolved {
            winning_side: Side::Yes,
        };

        assert_eq!(
            redeem(&pool, Side::No, UNIT, &resolved),
            Err(CpmmError::WrongSide {
                requested: Side::No,
                winning: Side::Yes
            })
        );

        let (after, usdo_out) = redeem(&pool, Side::Yes, 30 * UNIT, &resolved).unwrap();
        assert_eq!(usdo_out, 30 * UNIT);
        assert_eq!(after.collateral(), pool.collateral() - 30 * UNIT);
        assert_eq!(after.yes_balance(), pool.yes_balance());
    }

    #[test]
    fn test_redeem_more_than_collateral() {
        let resolved = MarketStatus::Resolved {
            winning_side: Side::No,
        };
        assert!(matches!(
            redeem(&seeded(), Side::No, 100 * UNIT + 1, &resolved),
            Err(CpmmError::InsufficientCollateral { .. })
        ));
    }

    #[test]
    fn test_failed_operation_leaves_input_untouched() {
        let pool = seeded();
        let snapshot = pool.clone();
        let _ = swap_yes_for_no(&pool, 10 * UNIT, u64::MAX);
        let _ = join(&pool, 1, 2);
        assert_eq!(pool, snapshot);
    }
}
