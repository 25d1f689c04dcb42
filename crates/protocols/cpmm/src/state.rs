//! CPMM State Types
//!
//! Data structures for pools, market lifecycle, operations and errors.

use std::fmt;

use corner_core::{Amount, MarketId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Two-sided liquidity pool of one market.
///
/// Balances are the pool's own YES/NO inventory, not the outstanding user
/// supply. `k` is only ever recomputed from the balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    market_id: MarketId,
    yes_balance: Amount,
    no_balance: Amount,
    k: u128,
    collateral: Amount,
}

impl Pool {
    /// Empty pool in seed state
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            yes_balance: 0,
            no_balance: 0,
            k: 0,
            collateral: 0,
        }
    }

    /// Rebuild a pool from stored fields (ledger reads, persistence).
    pub fn from_parts(
        market_id: MarketId,
        yes_balance: Amount,
        no_balance: Amount,
        k: u128,
        collateral: Amount,
    ) -> Self {
        Self {
            market_id,
            yes_balance,
            no_balance,
            k,
            collateral,
        }
    }

    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    pub fn yes_balance(&self) -> Amount {
        self.yes_balance
    }

    pub fn no_balance(&self) -> Amount {
        self.no_balance
    }

    pub fn k(&self) -> u128 {
        self.k
    }

    pub fn collateral(&self) -> Amount {
        self.collateral
    }

    /// Inventory on one side
    pub fn balance(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_balance,
            Side::No => self.no_balance,
        }
    }

    /// Both sides hold liquidity
    pub fn is_seeded(&self) -> bool {
        self.yes_balance > 0 && self.no_balance > 0
    }

    /// Current `yes_balance * no_balance`
    pub fn product(&self) -> u128 {
        self.yes_balance as u128 * self.no_balance as u128
    }

    /// Copy with new balances; `k` follows the balances.
    pub(crate) fn with_balances(&self, yes_balance: Amount, no_balance: Amount) -> Self {
        Self {
            market_id: self.market_id.clone(),
            yes_balance,
            no_balance,
            k: yes_balance as u128 * no_balance as u128,
            collateral: self.collateral,
        }
    }

    pub(crate) fn with_collateral(&self, collateral: Amount) -> Self {
        Self {
            collateral,
            ..self.clone()
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool {} | YES: {} | NO: {} | collateral: {}",
            self.market_id, self.yes_balance, self.no_balance, self.collateral
        )
    }
}

/// Market lifecycle. `Open -> Resolved` happens once and is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MarketStatus {
    #[default]
    Open,
    Resolved { winning_side: Side },
}

impl MarketStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn winning_side(&self) -> Option<Side> {
        match self {
            Self::Open => None,
            Self::Resolved { winning_side } => Some(*winning_side),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved { .. } => "resolved",
        }
    }
}

/// Percentage held as integer basis points (10_000 = 100%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(u32);

impl Percentage {
    pub const FULL: Self = Self(10_000);
    pub const EVEN: Self = Self(5_000);

    /// Clamped to 100%
    pub fn from_bps(bps: u32) -> Self {
        Self(bps.min(10_000))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// `100% - self`
    pub fn complement(&self) -> Self {
        Self(10_000 - self.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// A pool-mutating request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Split { usdo_in: Amount },
    SwapYesForNo { yes_in: Amount, min_no_out: Amount },
    SwapNoForYes { no_in: Amount, min_yes_out: Amount },
    Join { yes_in: Amount, no_in: Amount },
    Redeem { side: Side, amount: Amount },
}

impl Operation {
    /// Swap selling `side_in`
    pub fn swap(side_in: Side, amount_in: Amount, min_out: Amount) -> Self {
        match side_in {
            Side::Yes => Self::SwapYesForNo {
                yes_in: amount_in,
                min_no_out: min_out,
            },
            Side::No => Self::SwapNoForYes {
                no_in: amount_in,
                min_yes_out: min_out,
            },
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Split { .. } => OperationKind::Split,
            Self::SwapYesForNo { .. } | Self::SwapNoForYes { .. } => OperationKind::Swap,
            Self::Join { .. } => OperationKind::Join,
            Self::Redeem { .. } => OperationKind::Redeem,
        }
    }
}

/// Operation class, as seen by the settlement gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Split,
    Swap,
    Join,
    Redeem,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Swap => "swap",
            Self::Join => "join",
            Self::Redeem => "redeem",
        }
    }
}

/// What the caller receives from an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outputs {
    Split { yes_out: Amount, no_out: Amount },
    Swap { side_out: Side, amount_out: Amount },
    Join { usdo_out: Amount },
    Redeem { usdo_out: Amount },
}

/// Result of applying an operation to a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub pool: Pool,
    pub outputs: Outputs,
}

/// Pool math and lifecycle errors. None of these are retryable with the
/// same inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpmmError {
    #[error("Insufficient liquidity: pool is not seeded")]
    InsufficientLiquidity,

    #[error("Unbalanced pair: {yes_in} YES vs {no_in} NO")]
    UnbalancedPair { yes_in: Amount, no_in: Amount },

    #[error("Insufficient collateral: requested {requested}, locked {available}")]
    InsufficientCollateral { requested: Amount, available: Amount },

    #[error("Output below minimum: got {got}, need {min}")]
    SlippageExceeded { got: Amount, min: Amount },

    #[error("Market is not resolved")]
    MarketNotResolved,

    #[error("Market is resolved")]
    MarketResolved,

    #[error("Cannot redeem {requested}: winning side is {winning}")]
    WrongSide { requested: Side, winning: Side },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Pool not found: {0}")]
    PoolNotFound(MarketId),

    #[error("Pool already exists: {0}")]
    PoolAlreadyExists(MarketId),

    #[error("Insufficient {asset} balance: need {required}, have {available}")]
    InsufficientBalance {
        asset: &'static str,
        required: Amount,
        available: Amount,
    },
}

impl CpmmError {
    pub(crate) fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLiquidity => "insufficient_liquidity",
            Self::UnbalancedPair { .. } => "unbalanced_pair",
            Self::InsufficientCollateral { .. } => "insufficient_collateral",
            Self::SlippageExceeded { .. } => "slippage_exceeded",
            Self::MarketNotResolved => "market_not_resolved",
            Self::MarketResolved => "market_resolved",
            Self::WrongSide { .. } => "wrong_side",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::AmountOverflow => "amount_overflow",
            Self::PoolNotFound(_) => "pool_not_found",
            Self::PoolAlreadyExists(_) => "pool_already_exists",
            Self::InsufficientBalance { .. } => "insufficient_balance",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::UnbalancedPair { .. } | Self::AmountOverflow => 400,
            Self::PoolNotFound(_) => 404,
            Self::PoolAlreadyExists(_) | Self::MarketNotResolved | Self::MarketResolved => 409,
            Self::InsufficientLiquidity
            | Self::SlippageExceeded { .. }
            | Self::WrongSide { .. }
            | Self::InsufficientBalance { .. } => 422,
            Self::InsufficientCollateral { .. } => 500,
        }
    }

    /// Ledger accounting is broken; not a user mistake
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InsufficientCollateral { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_seed_state() {
        let pool = Pool::new(MarketId::new("m"));
        assert!(!pool.is_seeded());
        assert_eq!(pool.k(), 0);

        let half = Pool::from_parts(MarketId::new("m"), 10, 0, 0, 10);
        assert!(!half.is_seeded());
    }

    #[test]
    fn test_with_balances_recomputes_k() {
        let pool = Pool::new(MarketId::new("m")).with_balances(3, 7);
        assert_eq!(pool.k(), 21);
        assert_eq!(pool.product(), 21);
    }

    #[test]
    fn test_market_status_serialization() {
        let json = serde_json::to_value(MarketStatus::Resolved {
            winning_side: Side::Yes,
        })
        .unwrap();
        assert_eq!(json["state"], "resolved");
        assert_eq!(json["winning_side"], "yes");

        let open: MarketStatus = serde_json::from_str(r#"{"state":"open"}"#).unwrap();
        assert_eq!(open, MarketStatus::Open);
        assert_eq!(open.winning_side(), None);
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage::from_bps(5_000).to_string(), "50.00%");
        assert_eq!(Percentage::from_bps(4_545).to_string(), "45.45%");
        assert_eq!(Percentage::from_bps(7).to_string(), "0.07%");
        assert_eq!(Percentage::from_bps(20_000), Percentage::FULL);
        assert_eq!(Percentage::from_bps(4_545).complement().bps(), 5_455);
    }

    #[test]
    fn test_operation_swap_constructor() {
        assert_eq!(
            Operation::swap(Side::No, 5, 4),
            Operation::SwapNoForYes {
                no_in: 5,
                min_yes_out: 4
            }
        );
        assert_eq!(Operation::swap(Side::Yes, 5, 4).kind(), OperationKind::Swap);
    }

    #[test]
    fn test_error_codes() {
        let err = CpmmError::SlippageExceeded { got: 1, min: 2 };
        assert_eq!(err.error_code(), "slippage_exceeded");
        assert_eq!(err.status_code(), 422);
        assert!(!err.is_internal());

        let err = CpmmError::InsufficientCollateral {
            requested: 5,
            available: 1,
        };
        assert_eq!(err.status_code(), 500);
        assert!(err.is_internal());
    }
}
