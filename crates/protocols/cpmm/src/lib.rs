//! CPMM Outcome Pool Implementation
//!
//! This crate implements the YES/NO constant-product pools behind each
//! market: the pool math, the settlement gate, keyed pool storage, the
//! in-memory simulator and the ledger integration, tied together by the
//! [`TradingService`].

pub mod calculator;
pub mod constants;
pub mod engine;
pub mod fetch;
pub mod gate;
pub mod ledger;
pub mod service;
pub mod simulator;
pub mod state;
pub mod store;
pub mod tx_builder;

// Re-exports
pub use calculator::{
    calculate_output, calculate_price_impact_bps, implied_no_odds, implied_yes_odds,
    implied_yes_odds_with, quote_swap, suggest_min_out, SwapQuote,
};
pub use constants::{coin_types, entry};
pub use engine::{join, redeem, split, swap, swap_no_for_yes, swap_yes_for_no};
pub use fetch::{parse_market, parse_pool, MarketRecord};
pub use ledger::{PoolLedger, SuiLedger};
pub use service::{
    BalanceView, BuyQuote, Execution, ExecutionMode, PoolView, ServiceConfig, TradeError,
    TradingService,
};
pub use simulator::{BuyOutcome, DemoWallet, Position, Simulator};
pub use state::{
    CpmmError, MarketStatus, Operation, OperationKind, Outputs, Percentage, Pool, Side, Transition,
};
pub use store::{MarketEntry, PoolStore, WriteGuard};
pub use tx_builder::{build_move_call, CallBuildResult, CallSummary};
