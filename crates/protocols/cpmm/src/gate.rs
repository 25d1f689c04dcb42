//! Settlement Gate
//!
//! Market lifecycle `Open -> Resolved` and which operations each phase
//! allows. While open: split, swaps and join. Once resolved: redeem only.

use crate::engine;
use crate::state::{CpmmError, MarketStatus, Operation, OperationKind, Outputs, Pool, Side, Transition};

/// Check that `kind` is legal in the market's current phase
pub fn authorize(market: &MarketStatus, kind: OperationKind) -> Result<(), CpmmError> {
    match (market, kind) {
        (MarketStatus::Open, OperationKind::Redeem) => Err(CpmmError::MarketNotResolved),
        (MarketStatus::Open, _) => Ok(()),
        (MarketStatus::Resolved { .. }, OperationKind::Redeem) => Ok(()),
        (MarketStatus::Resolved { .. }, _) => Err(CpmmError::MarketResolved),
    }
}

/// Resolve an open market. A second resolution is rejected.
pub fn resolve(market: &MarketStatus, winning_side: Side) -> Result<MarketStatus, CpmmError> {
    match market {
        MarketStatus::Open => Ok(MarketStatus::Resolved { winning_side }),
        MarketStatus::Resolved { .. } => Err(CpmmError::MarketResolved),
    }
}

/// Gate then apply an operation
pub fn apply(pool: &Pool, market: &MarketStatus, operation: &Operation) -> Result<Transition, CpmmError> {
    authorize(market, operation.kind())?;

    let transition = match *operation {
        Operation::Split { usdo_in } => {
            let (pool, yes_out, no_out) = engine::split(pool, usdo_in)?;
            Transition {
                pool,
                outputs: Outputs::Split { yes_out, no_out },
            }
        }
        Operation::SwapYesForNo { yes_in, min_no_out } => {
            let (pool, amount_out) = engine::swap_yes_for_no(pool, yes_in, min_no_out)?;
            Transition {
                pool,
                outputs: Outputs::Swap {
                    side_out: Side::No,
                    amount_out,
                },
            }
        }
        Operation::SwapNoForYes { no_in, min_yes_out } => {
            let (pool, amount_out) = engine::swap_no_for_yes(pool, no_in, min_yes_out)?;
            Transition {
                pool,
                outputs: Outputs::Swap {
                    side_out: Side::Yes,
                    amount_out,
                },
            }
        }
        Operation::Join { yes_in, no_in } => {
            let (pool, usdo_out) = engine::join(pool, yes_in, no_in)?;
            Transition {
                pool,
                outputs: Outputs::Join { usdo_out },
            }
        }
        Operation::Redeem { side, amount } => {
            let (pool, usdo_out) = engine::redeem(pool, side, amount, market)?;
            Transition {
                pool,
                outputs: Outputs::Redeem { usdo_out },
            }
        }
    };

    Ok(transition)
}
