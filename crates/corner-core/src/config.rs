//! Configuration types for Open Corner

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::BASE_UNITS_PER_USDO;
use crate::{Amount, Error};

/// Environment variable naming a JSON config file
pub const CONFIG_PATH_ENV: &str = "OPEN_CORNER_CONFIG";

/// Environment variable overriding the API port
pub const PORT_ENV: &str = "OPEN_CORNER_PORT";

/// Ledger connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint (e.g., "https://fullnode.testnet.sui.io:443")
    pub rpc_url: String,

    /// Package ID of the deployed market contracts
    pub package_id: String,

    /// Wallet bridge that signs and executes transactions (optional)
    #[serde(default)]
    pub signer_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://fullnode.testnet.sui.io:443".to_string(),
            package_id: "0x0".to_string(),
            signer_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Where operations are executed by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPreference {
    /// Submit to the ledger
    #[default]
    Authoritative,
    /// Run against the in-memory simulator only
    Simulated,
}

/// How implied odds are read from pool balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OddsConvention {
    /// YES odds = NO inventory share (the CPMM marginal price of YES)
    #[default]
    Price,
    /// YES odds = YES inventory share
    InventoryShare,
}

/// Simulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Collateral used to seed a pool on first touch (base units)
    #[serde(default = "default_initial_liquidity")]
    pub initial_liquidity: Amount,

    /// USDO credited to a demo wallet on first use (base units)
    #[serde(default = "default_demo_wallet_balance")]
    pub demo_wallet_balance: Amount,

    /// Markets seeded at startup. Reads of any other market report it as
    /// unknown until a split creates it.
    #[serde(default = "default_demo_markets")]
    pub markets: Vec<String>,
}

fn default_initial_liquidity() -> Amount {
    100 * BASE_UNITS_PER_USDO
}

fn default_demo_wallet_balance() -> Amount {
    10_000 * BASE_UNITS_PER_USDO
}

fn default_demo_markets() -> Vec<String> {
    vec!["main-event".to_string()]
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_liquidity: default_initial_liquidity(),
            demo_wallet_balance: default_demo_wallet_balance(),
            markets: default_demo_markets(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ledger connection settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Default execution target
    #[serde(default)]
    pub execution: ExecutionPreference,

    /// Replay failed ledger submissions against the simulator.
    /// Results produced this way are flagged as simulated.
    #[serde(default = "default_fallback")]
    pub fallback_to_simulator: bool,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Slippage tolerance applied to quotes (basis points)
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,

    #[serde(default)]
    pub odds_convention: OddsConvention,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

fn default_fallback() -> bool {
    true
}

fn default_api_port() -> u16 {
    19090
}

fn default_slippage_bps() -> u32 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            execution: ExecutionPreference::default(),
            fallback_to_simulator: default_fallback(),
            api_port: default_api_port(),
            default_slippage_bps: default_slippage_bps(),
            odds_convention: OddsConvention::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `OPEN_CORNER_CONFIG` if set, else defaults. `OPEN_CORNER_PORT`
    /// overrides the API port either way.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path)?,
            _ => Self::default(),
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            config.api_port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: {}", PORT_ENV, port)))?;
        }

        Ok(config)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<(), Error> {
        if self.default_slippage_bps > crate::constants::BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "default_slippage_bps must be at most 10000, got {}",
                self.default_slippage_bps
            )));
        }
        if self.ledger.request_timeout_secs == 0 {
            return Err(Error::Config(
                "ledger.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
