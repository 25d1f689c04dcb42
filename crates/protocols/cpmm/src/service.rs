//! Trading Service
//!
//! Routes every operation either to the ledger (authoritative) or to the
//! simulator. Pool math and gating always run locally first, so a request
//! the ledger would reject for pool reasons never leaves the process.
//!
//! When `fallback_to_simulator` is on, a ledger failure is replayed against
//! the simulator and the result says so: `mode = simulated` plus the
//! triggering error in `degraded_reason`. A timed-out submission is never
//! replayed, since it may still land.

use std::fmt;
use std::sync::Arc;

use corner_core::{Address, Amount, AppConfig, ExecutionPreference, LedgerError, MarketId, OddsConvention};
use serde::{Deserialize, Serialize};
use sui_client::TxReceipt;
use thiserror::Error;
use uuid::Uuid;

use crate::calculator::{self, SwapQuote};
use crate::gate;
use crate::ledger::PoolLedger;
use crate::simulator::{BuyOutcome, DemoWallet, Simulator};
use crate::state::{CpmmError, MarketStatus, Operation, OperationKind, Outputs, Percentage, Pool, Side};
use crate::store::MarketEntry;

/// Where a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Authoritative,
    /// Demo path: no real collateral moved
    Simulated,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authoritative => "authoritative",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution<T> {
    pub mode: ExecutionMode,
    pub outputs: T,
    /// Pool after the operation. In authoritative mode this is re-read from
    /// the ledger when possible.
    pub pool: Pool,
    pub receipt: TxReceipt,
    /// Set when a ledger failure pushed the operation to the simulator
    pub degraded_reason: Option<String>,
}

impl<T> Execution<T> {
    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}

/// Pool read with derived odds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolView {
    pub pool: Pool,
    pub status: MarketStatus,
    pub yes_odds: Percentage,
    pub no_odds: Percentage,
    pub mode: ExecutionMode,
    pub degraded_reason: Option<String>,
}

/// Expected result of buying one side with USDO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    pub side: Side,
    pub usdo_in: Amount,
    /// Wanted-side tokens from split plus swap
    pub expected_out: Amount,
    /// Guard for the swap leg
    pub min_swap_out: Amount,
    pub price_impact_bps: u32,
    pub yes_odds_after: Percentage,
}

/// Collateral balance with its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub address: Address,
    pub usdo: Amount,
    pub mode: ExecutionMode,
    pub degraded_reason: Option<String>,
}

/// Service-level errors
#[derive(Debug, Error)]
pub enum TradeError {
    #[error(transparent)]
    Pool(#[from] CpmmError),

    #[error("External transaction failed: {reason}")]
    ExternalTransactionFailed { reason: String },

    #[error("Transaction outcome unknown: {reason}")]
    OutcomeUnknown { reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl TradeError {
    /// Whether the same request may succeed if sent again.
    /// `OutcomeUnknown` needs a state re-read first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExternalTransactionFailed { .. } => true,
            Self::Ledger(e) => !matches!(
                e,
                LedgerError::InvalidObjectId { .. }
                    | LedgerError::ObjectNotFound { .. }
                    | LedgerError::ParseError(_)
                    | LedgerError::SignerUnavailable
            ),
            Self::Pool(_) | Self::OutcomeUnknown { .. } | Self::Unsupported(_) => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Pool(e) => e.error_code(),
            Self::ExternalTransactionFailed { .. } => "external_transaction_failed",
            Self::OutcomeUnknown { .. } => "outcome_unknown",
            Self::Ledger(e) => e.error_code(),
            Self::Unsupported(_) => "unsupported",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Pool(e) => e.status_code(),
            Self::ExternalTransactionFailed { .. } => 502,
            Self::OutcomeUnknown { .. } => 504,
            Self::Ledger(e) => e.status_code(),
            Self::Unsupported(_) => 501,
        }
    }
}

/// Routing settings, taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub preference: ExecutionPreference,
    pub fallback_to_simulator: bool,
    pub default_slippage_bps: u32,
    pub odds_convention: OddsConvention,
}

impl ServiceConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            preference: config.execution,
            fallback_to_simulator: config.fallback_to_simulator,
            default_slippage_bps: config.default_slippage_bps,
            odds_convention: config.odds_convention,
        }
    }
}

fn simulated_receipt() -> TxReceipt {
    TxReceipt::simulated(format!("sim-{}", Uuid::new_v4()))
}

/// Error of a simulator run. When the run replays a failed ledger call and
/// the simulator lacks the caller's holdings or the market, the ledger
/// failure is what the caller sees.
fn replay_error(error: CpmmError, degraded_reason: Option<String>) -> TradeError {
    match (error, degraded_reason) {
        (
            e @ (CpmmError::InsufficientBalance { .. } | CpmmError::PoolNotFound(_)),
            Some(reason),
        ) => {
            tracing::warn!("Simulator cannot stand in for the ledger ({}): {}", reason, e);
            TradeError::ExternalTransactionFailed { reason }
        }
        (e, _) => e.into(),
    }
}

/// Operation router over a ledger and a simulator
pub struct TradingService<L: PoolLedger> {
    ledger: L,
    simulator: Arc<Simulator>,
    config: ServiceConfig,
}

impl<L: PoolLedger> TradingService<L> {
    pub fn new(ledger: L, simulator: Arc<Simulator>, config: ServiceConfig) -> Self {
        Self {
            ledger,
            simulator,
            config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn simulator(&self) -> &Arc<Simulator> {
        &self.simulator
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn is_simulated(&self) -> bool {
        self.config.preference == ExecutionPreference::Simulated
    }

    /// Read pool and status from the ledger and mirror them into the
    /// simulator's store, so a later fallback starts from ledger state
    async fn read_market(&self, market_id: &MarketId) -> Result<(Pool, MarketStatus), LedgerError> {
        let pool = self.ledger.fetch_pool(market_id).await?;
        let status = self.ledger.fetch_market_state(market_id).await?;
        self.simulator
            .store()
            .upsert(MarketEntry {
                pool: pool.clone(),
                status,
            })
            .await;
        Ok((pool, status))
    }

    /// Pool after a landed submission; the local expectation if the re-read fails
    async fn settled_pool(&self, market_id: &MarketId, expected: Pool) -> Pool {
        match self.ledger.fetch_pool(market_id).await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(
                    "Could not re-read pool of {} after submission: {}",
                    market_id,
                    e
                );
                expected
            }
        }
    }

    /// A failed ledger read. Nothing was submitted, so a timeout here is
    /// just a slow read.
    fn read_fallback_reason(
        &self,
        market_id: &MarketId,
        kind: &str,
        error: LedgerError,
    ) -> Result<String, TradeError> {
        if !self.config.fallback_to_simulator {
            tracing::error!("{} on {}: ledger read failed: {}", kind, market_id, error);
            return Err(TradeError::Ledger(error));
        }
        tracing::warn!(
            "{} on {}: ledger read failed ({}); using the simulator",
            kind,
            market_id,
            error
        );
        Ok(error.to_string())
    }

    /// A failed submission: the flagged simulator path or a hard failure
    fn submit_fallback_reason(
        &self,
        market_id: &MarketId,
        kind: &str,
        error: LedgerError,
    ) -> Result<String, TradeError> {
        if error.outcome_unknown() {
            tracing::error!("{} on {} timed out: {}", kind, market_id, error);
            return Err(TradeError::OutcomeUnknown {
                reason: error.to_string(),
            });
        }
        if !self.config.fallback_to_simulator {
            tracing::error!("{} on {} failed on the ledger: {}", kind, market_id, error);
            return Err(TradeError::ExternalTransactionFailed {
                reason: error.to_string(),
            });
        }
        tracing::warn!(
            "{} on {} failed on the ledger ({}); falling back to the simulator",
            kind,
            market_id,
            error
        );
        Ok(error.to_string())
    }

    async fn simulate(
        &self,
        market_id: &MarketId,
        sender: &Address,
        operation: &Operation,
        degraded_reason: Option<String>,
    ) -> Result<Execution<Outputs>, TradeError> {
        if let Operation::Split { .. } = operation {
            self.simulator.ensure_pool(market_id).await?;
        }
        let transition = match self.simulator.execute(market_id, sender, operation).await {
            Ok(transition) => transition,
            Err(e) => return Err(replay_error(e, degraded_reason)),
        };
        Ok(Execution {
            mode: ExecutionMode::Simulated,
            outputs: transition.outputs,
            pool: transition.pool,
            receipt: simulated_receipt(),
            degraded_reason,
        })
    }

    /// Execute one operation for `sender`.
    ///
    /// Authoritative outputs are the local expectation from the pre-trade
    /// pool; the ledger enforces the slippage guard on the real fill.
    pub async fn execute(
        &self,
        market_id: &MarketId,
        sender: &Address,
        operation: &Operation,
    ) -> Result<Execution<Outputs>, TradeError> {
        if self.is_simulated() {
            return self.simulate(market_id, sender, operation, None).await;
        }

        let kind = operation.kind().as_str();
        let (pool, status) = match self.read_market(market_id).await {
            Ok(read) => read,
            Err(e) => {
                let reason = self.read_fallback_reason(market_id, kind, e)?;
                return self.simulate(market_id, sender, operation, Some(reason)).await;
            }
        };

        let expected = gate::apply(&pool, &status, operation)?;

        match self.ledger.submit(sender, market_id, operation).await {
            Ok(receipt) => {
                let pool = self.settled_pool(market_id, expected.pool).await;
                Ok(Execution {
                    mode: ExecutionMode::Authoritative,
                    outputs: expected.outputs,
                    pool,
                    receipt,
                    degraded_reason: None,
                })
            }
            Err(e) => {
                let reason = self.submit_fallback_reason(market_id, kind, e)?;
                self.simulate(market_id, sender, operation, Some(reason)).await
            }
        }
    }

    pub async fn split(
        &self,
        market_id: &MarketId,
        sender: &Address,
        usdo_in: Amount,
    ) -> Result<Execution<Outputs>, TradeError> {
        self.execute(market_id, sender, &Operation::Split { usdo_in })
            .await
    }

    /// Sell `amount_in` of `side_in` for the opposite side
    pub async fn swap(
        &self,
        market_id: &MarketId,
        sender: &Address,
        side_in: Side,
        amount_in: Amount,
        min_out: Amount,
    ) -> Result<Execution<Outputs>, TradeError> {
        self.execute(market_id, sender, &Operation::swap(side_in, amount_in, min_out))
            .await
    }

    pub async fn join(
        &self,
        market_id: &MarketId,
        sender: &Address,
        yes_in: Amount,
        no_in: Amount,
    ) -> Result<Execution<Outputs>, TradeError> {
        self.execute(market_id, sender, &Operation::Join { yes_in, no_in })
            .await
    }

    pub async fn redeem(
        &self,
        market_id: &MarketId,
        sender: &Address,
        side: Side,
        amount: Amount,
    ) -> Result<Execution<Outputs>, TradeError> {
        self.execute(market_id, sender, &Operation::Redeem { side, amount })
            .await
    }

    async fn simulate_buy(
        &self,
        market_id: &MarketId,
        sender: &Address,
        side: Side,
        usdo_in: Amount,
        min_out: Amount,
        degraded_reason: Option<String>,
    ) -> Result<Execution<BuyOutcome>, TradeError> {
        let (pool, outcome) = match self
            .simulator
            .buy(market_id, sender, side, usdo_in, min_out)
            .await
        {
            Ok(bought) => bought,
            Err(e) => return Err(replay_error(e, degraded_reason)),
        };
        Ok(Execution {
            mode: ExecutionMode::Simulated,
            outputs: outcome,
            pool,
            receipt: simulated_receipt(),
            degraded_reason,
        })
    }

    /// Buy `side` with USDO: split, then swap the unwanted leg.
    ///
    /// On the ledger these are two transactions. Once the split has landed
    /// the buy never falls back to the simulator: a failed swap leaves the
    /// caller holding the split pair and is reported as a failure.
    pub async fn buy(
        &self,
        market_id: &MarketId,
        sender: &Address,
        side: Side,
        usdo_in: Amount,
        min_out: Amount,
    ) -> Result<Execution<BuyOutcome>, TradeError> {
        if self.is_simulated() {
            return self
                .simulate_buy(market_id, sender, side, usdo_in, min_out, None)
                .await;
        }

        let (pool, status) = match self.read_market(market_id).await {
            Ok(read) => read,
            Err(e) => {
                let reason = self.read_fallback_reason(market_id, "buy", e)?;
                return self
                    .simulate_buy(market_id, sender, side, usdo_in, min_out, Some(reason))
                    .await;
            }
        };

        // Check both legs before sending anything
        let split_op = Operation::Split { usdo_in };
        let split = gate::apply(&pool, &status, &split_op)?;
        let Outputs::Split { yes_out, no_out } = split.outputs else {
            return Err(CpmmError::invalid_amount("split produced no pair").into());
        };
        let (wanted, unwanted) = match side {
            Side::Yes => (yes_out, no_out),
            Side::No => (no_out, yes_out),
        };
        let swap_op = Operation::swap(side.opposite(), unwanted, min_out);
        let swap = gate::apply(&split.pool, &status, &swap_op)?;
        let Outputs::Swap { amount_out, .. } = swap.outputs else {
            return Err(CpmmError::invalid_amount("swap produced no output").into());
        };

        let split_receipt = match self.ledger.submit(sender, market_id, &split_op).await {
            Ok(receipt) => receipt,
            Err(e) => {
                let reason = self.submit_fallback_reason(market_id, "buy", e)?;
                return self
                    .simulate_buy(market_id, sender, side, usdo_in, min_out, Some(reason))
                    .await;
            }
        };

        let receipt = match self.ledger.submit(sender, market_id, &swap_op).await {
            Ok(receipt) => receipt,
            Err(e) if e.outcome_unknown() => {
                tracing::error!(
                    "Buy on {}: split {} landed, swap timed out: {}",
                    market_id,
                    split_receipt.digest,
                    e
                );
                return Err(TradeError::OutcomeUnknown {
                    reason: format!("split {} landed; swap: {}", split_receipt.digest, e),
                });
            }
            Err(e) => {
                tracing::error!(
                    "Buy on {}: split {} landed, swap failed: {}",
                    market_id,
                    split_receipt.digest,
                    e
                );
                return Err(TradeError::ExternalTransactionFailed {
                    reason: format!(
                        "split {} landed ({} YES / {} NO held); swap: {}",
                        split_receipt.digest, yes_out, no_out, e
                    ),
                });
            }
        };

        let pool = self.settled_pool(market_id, swap.pool).await;
        Ok(Execution {
            mode: ExecutionMode::Authoritative,
            outputs: BuyOutcome {
                side,
                usdo_in,
                split_out: wanted,
                swap_out: amount_out,
            },
            pool,
            receipt,
            degraded_reason: None,
        })
    }

    /// Pool snapshot and status, routed like operations
    async fn read_entry(
        &self,
        market_id: &MarketId,
    ) -> Result<(MarketEntry, ExecutionMode, Option<String>), TradeError> {
        if !self.is_simulated() {
            match self.read_market(market_id).await {
                Ok((pool, status)) => {
                    return Ok((MarketEntry { pool, status }, ExecutionMode::Authoritative, None))
                }
                Err(e) if self.config.fallback_to_simulator => {
                    // Without a simulator copy there is nothing to stand in with
                    let Ok(entry) = self.simulator.snapshot(market_id).await else {
                        return Err(e.into());
                    };
                    tracing::warn!(
                        "Reading {} from the ledger failed ({}); using the simulator",
                        market_id,
                        e
                    );
                    return Ok((entry, ExecutionMode::Simulated, Some(e.to_string())));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let entry = self.simulator.snapshot(market_id).await?;
        Ok((entry, ExecutionMode::Simulated, None))
    }

    /// Pool with implied odds under the configured convention
    pub async fn pool_view(&self, market_id: &MarketId) -> Result<PoolView, TradeError> {
        let (entry, mode, degraded_reason) = self.read_entry(market_id).await?;
        let yes_odds = calculator::implied_yes_odds_with(&entry.pool, self.config.odds_convention);
        Ok(PoolView {
            pool: entry.pool,
            status: entry.status,
            yes_odds,
            no_odds: yes_odds.complement(),
            mode,
            degraded_reason,
        })
    }

    /// Quote a swap selling `side_in`. Slippage defaults to the configured value.
    pub async fn quote(
        &self,
        market_id: &MarketId,
        side_in: Side,
        amount_in: Amount,
        slippage_bps: Option<u32>,
    ) -> Result<(SwapQuote, ExecutionMode), TradeError> {
        let (entry, mode, _) = self.read_entry(market_id).await?;
        gate::authorize(&entry.status, OperationKind::Swap)?;
        if !entry.pool.is_seeded() {
            return Err(CpmmError::InsufficientLiquidity.into());
        }

        let slippage = slippage_bps.unwrap_or(self.config.default_slippage_bps);
        let quote = calculator::quote_swap(&entry.pool, side_in, amount_in, slippage)
            .ok_or_else(|| CpmmError::invalid_amount("amount too small to quote"))?;
        Ok((quote, mode))
    }

    /// Quote a buy of `side` with `usdo_in`
    pub async fn quote_buy(
        &self,
        market_id: &MarketId,
        side: Side,
        usdo_in: Amount,
        slippage_bps: Option<u32>,
    ) -> Result<(BuyQuote, ExecutionMode), TradeError> {
        let (entry, mode, _) = self.read_entry(market_id).await?;
        let split = gate::apply(&entry.pool, &entry.status, &Operation::Split { usdo_in })?;
        let Outputs::Split { yes_out, no_out } = split.outputs else {
            return Err(CpmmError::invalid_amount("split produced no pair").into());
        };
        let (wanted, unwanted) = match side {
            Side::Yes => (yes_out, no_out),
            Side::No => (no_out, yes_out),
        };

        let slippage = slippage_bps.unwrap_or(self.config.default_slippage_bps);
        let swap = calculator::quote_swap(&split.pool, side.opposite(), unwanted, slippage)
            .ok_or_else(|| CpmmError::invalid_amount("amount too small to quote"))?;

        Ok((
            BuyQuote {
                side,
                usdo_in,
                expected_out: wanted + swap.amount_out,
                min_swap_out: swap.min_out,
                price_impact_bps: swap.price_impact_bps,
                yes_odds_after: swap.yes_odds_after,
            },
            mode,
        ))
    }

    /// USDO held by `address`; the demo wallet in simulated mode
    pub async fn collateral_balance(&self, address: &Address) -> Result<BalanceView, TradeError> {
        if !self.is_simulated() {
            match self.ledger.fetch_collateral_balance(address).await {
                Ok(usdo) => {
                    return Ok(BalanceView {
                        address: address.clone(),
                        usdo,
                        mode: ExecutionMode::Authoritative,
                        degraded_reason: None,
                    })
                }
                Err(e) if self.config.fallback_to_simulator => {
                    tracing::warn!(
                        "Balance of {} unavailable ({}); showing the demo wallet",
                        address,
                        e
                    );
                    let wallet = self.simulator.wallet(address).await;
                    return Ok(BalanceView {
                        address: address.clone(),
                        usdo: wallet.usdo,
                        mode: ExecutionMode::Simulated,
                        degraded_reason: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let wallet = self.simulator.wallet(address).await;
        Ok(BalanceView {
            address: address.clone(),
            usdo: wallet.usdo,
            mode: ExecutionMode::Simulated,
            degraded_reason: None,
        })
    }

    /// Simulated holdings of `address`
    pub async fn demo_wallet(&self, address: &Address) -> DemoWallet {
        self.simulator.wallet(address).await
    }

    /// Resolve a simulated market. Ledger markets are resolved by their
    /// oracle, not through this service.
    pub async fn resolve(
        &self,
        market_id: &MarketId,
        winning_side: Side,
    ) -> Result<MarketStatus, TradeError> {
        if !self.is_simulated() {
            return Err(TradeError::Unsupported(
                "ledger markets are resolved on-chain".to_string(),
            ));
        }
        Ok(self.simulator.resolve(market_id, winning_side).await?)
    }
}
