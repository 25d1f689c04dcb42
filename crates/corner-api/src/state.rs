//! Application state shared across API handlers

use std::sync::Arc;

use corner_core::{AppConfig, LedgerError};
use cpmm::{CpmmError, ServiceConfig, Simulator, SuiLedger, TradingService};
use thiserror::Error;

/// Errors that can occur building the API state
#[derive(Debug, Error)]
pub enum StateError {
    /// Ledger client or signer could not be constructed
    #[error("Ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A configured demo market could not be seeded
    #[error("Simulator setup failed: {0}")]
    Simulator(#[from] CpmmError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    service: TradingService<SuiLedger>,
}

impl AppState {
    /// Wire the ledger and a simulator holding the configured demo markets
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        config
            .validate()
            .map_err(|e| StateError::Config(e.to_string()))?;

        let ledger = SuiLedger::from_config(&config.ledger)?;
        if !ledger.has_signer() {
            tracing::warn!("No signer configured; ledger submissions will fail");
        }

        let simulator = Arc::new(Simulator::with_demo_markets(config.simulator.clone())?);
        let service = TradingService::new(ledger, simulator, ServiceConfig::from_app(&config));

        Ok(Self {
            inner: Arc::new(AppStateInner { config, service }),
        })
    }

    /// Get current config
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn service(&self) -> &TradingService<SuiLedger> {
        &self.inner.service
    }
}
