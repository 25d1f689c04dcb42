//! Data Transfer Objects for API requests and responses
//!
//! Token amounts travel as decimal strings in whole-token units
//! (`"12.5"` USDO, YES or NO; 9 decimals) so no precision is lost in JSON.

use corner_core::{format_units, parse_units, Amount};
use cpmm::{
    BalanceView, BuyOutcome, BuyQuote, Execution, ExecutionMode, MarketStatus, Outputs, PoolView,
    Side, SwapQuote, TradeError,
};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Configured execution target
    pub execution: String,
    pub fallback_to_simulator: bool,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&TradeError> for ApiError {
    fn from(e: &TradeError) -> Self {
        Self {
            code: e.error_code().to_string(),
            message: e.to_string(),
            retryable: e.is_retryable(),
        }
    }
}

/// Parse a decimal token amount from a request field
pub fn parse_amount(field: &str, value: &str) -> Result<Amount, ApiError> {
    parse_units(value)
        .map_err(|e| ApiError::new("invalid_amount", format!("{}: {}", field, e)))
}

/// Pool state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolResponse {
    pub market_id: String,
    pub yes_balance: String,
    pub no_balance: String,
    /// Invariant product in base units squared
    pub k: String,
    pub collateral: String,
    pub yes_odds_bps: u32,
    pub no_odds_bps: u32,
    /// e.g. "52.38%"
    pub yes_odds: String,
    pub no_odds: String,
    /// "open" or "resolved"
    pub state: String,
    pub winning_side: Option<Side>,
    pub mode: ExecutionMode,
    pub degraded_reason: Option<String>,
}

impl From<PoolView> for PoolResponse {
    fn from(view: PoolView) -> Self {
        Self {
            market_id: view.pool.market_id().to_string(),
            yes_balance: format_units(view.pool.yes_balance()),
            no_balance: format_units(view.pool.no_balance()),
            k: view.pool.k().to_string(),
            collateral: format_units(view.pool.collateral()),
            yes_odds_bps: view.yes_odds.bps(),
            no_odds_bps: view.no_odds.bps(),
            yes_odds: view.yes_odds.to_string(),
            no_odds: view.no_odds.to_string(),
            state: view.status.as_str().to_string(),
            winning_side: view.status.winning_side(),
            mode: view.mode,
            degraded_reason: view.degraded_reason,
        }
    }
}

/// Swap quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Side being sold to the pool
    pub side: Side,
    pub amount_in: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

/// Swap quote response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub side_in: Side,
    pub amount_in: String,
    pub amount_out: String,
    pub min_out: String,
    pub price_impact_bps: u32,
    pub yes_odds_after: String,
    pub mode: ExecutionMode,
}

impl QuoteResponse {
    pub fn new(quote: SwapQuote, mode: ExecutionMode) -> Self {
        Self {
            side_in: quote.side_in,
            amount_in: format_units(quote.amount_in),
            amount_out: format_units(quote.amount_out),
            min_out: format_units(quote.min_out),
            price_impact_bps: quote.price_impact_bps,
            yes_odds_after: quote.yes_odds_after.to_string(),
            mode,
        }
    }
}

/// Buy quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyQuoteRequest {
    pub side: Side,
    pub usdo_in: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

/// Buy quote response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyQuoteResponse {
    pub side: Side,
    pub usdo_in: String,
    pub expected_out: String,
    pub min_swap_out: String,
    pub price_impact_bps: u32,
    pub yes_odds_after: String,
    pub mode: ExecutionMode,
}

impl BuyQuoteResponse {
    pub fn new(quote: BuyQuote, mode: ExecutionMode) -> Self {
        Self {
            side: quote.side,
            usdo_in: format_units(quote.usdo_in),
            expected_out: format_units(quote.expected_out),
            min_swap_out: format_units(quote.min_swap_out),
            price_impact_bps: quote.price_impact_bps,
            yes_odds_after: quote.yes_odds_after.to_string(),
            mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub address: String,
    pub usdo_in: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub address: String,
    pub side_in: Side,
    pub amount_in: String,
    pub min_out: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub address: String,
    pub yes_in: String,
    pub no_in: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub address: String,
    pub side: Side,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyRequest {
    pub address: String,
    pub side: Side,
    pub usdo_in: String,
    /// Guard for the swap leg, derived from a fresh quote
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub winning_side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub market_id: String,
    pub state: String,
    pub winning_side: Option<Side>,
}

impl ResolveResponse {
    pub fn new(market_id: String, status: MarketStatus) -> Self {
        Self {
            market_id,
            state: status.as_str().to_string(),
            winning_side: status.winning_side(),
        }
    }
}

/// Operation outputs with display amounts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputsDto {
    Split {
        yes_out: String,
        no_out: String,
    },
    Swap {
        side_out: Side,
        amount_out: String,
    },
    Join {
        usdo_out: String,
    },
    Redeem {
        usdo_out: String,
    },
    Buy {
        side: Side,
        split_out: String,
        swap_out: String,
        total_out: String,
    },
}

impl From<Outputs> for OutputsDto {
    fn from(outputs: Outputs) -> Self {
        match outputs {
            Outputs::Split { yes_out, no_out } => Self::Split {
                yes_out: format_units(yes_out),
                no_out: format_units(no_out),
            },
            Outputs::Swap {
                side_out,
                amount_out,
            } => Self::Swap {
                side_out,
                amount_out: format_units(amount_out),
            },
            Outputs::Join { usdo_out } => Self::Join {
                usdo_out: format_units(usdo_out),
            },
            Outputs::Redeem { usdo_out } => Self::Redeem {
                usdo_out: format_units(usdo_out),
            },
        }
    }
}

impl From<BuyOutcome> for OutputsDto {
    fn from(outcome: BuyOutcome) -> Self {
        Self::Buy {
            side: outcome.side,
            split_out: format_units(outcome.split_out),
            swap_out: format_units(outcome.swap_out),
            total_out: format_units(outcome.total_out()),
        }
    }
}

/// Result of a mutating operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub mode: ExecutionMode,
    /// True when a ledger failure pushed the operation to the simulator
    pub degraded: bool,
    pub degraded_reason: Option<String>,
    pub digest: String,
    pub on_ledger: bool,
    pub outputs: OutputsDto,
    pub yes_balance: String,
    pub no_balance: String,
    pub collateral: String,
}

impl<T: Into<OutputsDto>> From<Execution<T>> for ExecutionResponse {
    fn from(execution: Execution<T>) -> Self {
        Self {
            mode: execution.mode,
            degraded: execution.degraded_reason.is_some(),
            degraded_reason: execution.degraded_reason,
            digest: execution.receipt.digest.to_string(),
            on_ledger: execution.receipt.on_ledger,
            outputs: execution.outputs.into(),
            yes_balance: format_units(execution.pool.yes_balance()),
            no_balance: format_units(execution.pool.no_balance()),
            collateral: format_units(execution.pool.collateral()),
        }
    }
}

/// Collateral balance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub usdo: String,
    pub mode: ExecutionMode,
    pub degraded_reason: Option<String>,
}

impl From<BalanceView> for BalanceResponse {
    fn from(view: BalanceView) -> Self {
        Self {
            address: view.address.to_string(),
            usdo: format_units(view.usdo),
            mode: view.mode,
            degraded_reason: view.degraded_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("usdo_in", "12.5").unwrap(), 12_500_000_000);

        let err = parse_amount("usdo_in", "-1").unwrap_err();
        assert_eq!(err.code, "invalid_amount");
        assert!(err.message.starts_with("usdo_in"));
    }

    #[test]
    fn test_api_error_from_trade_error() {
        let err = TradeError::ExternalTransactionFailed {
            reason: "rpc down".into(),
        };
        let dto = ApiError::from(&err);
        assert_eq!(dto.code, "external_transaction_failed");
        assert!(dto.retryable);
    }

    #[test]
    fn test_outputs_dto_serialization() {
        let dto = OutputsDto::from(Outputs::Swap {
            side_out: Side::No,
            amount_out: 8_333_333_333,
        });
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["type"], "swap");
        assert_eq!(json["side_out"], "no");
        assert_eq!(json["amount_out"], "8.333333333");
    }
}
