//! Core type definitions for Open Corner

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LedgerError;

/// Market identifier. On the ledger this is the Market object ID; the
/// simulator accepts any non-empty key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub String);

impl MarketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger object ID (32 bytes, `0x`-prefixed hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Parse and validate an object ID.
    ///
    /// Accepts `0x` followed by 1..=64 hex digits. Placeholder values such as
    /// `PLACEHOLDER_POOL_ID` are rejected.
    pub fn parse(id: &str) -> Result<Self, LedgerError> {
        let body = id
            .strip_prefix("0x")
            .ok_or_else(|| LedgerError::InvalidObjectId { id: id.to_string() })?;

        if body.is_empty() || body.len() > 64 {
            return Err(LedgerError::InvalidObjectId { id: id.to_string() });
        }

        // hex::decode wants an even number of digits
        let padded = if body.len() % 2 == 1 {
            format!("0{}", body)
        } else {
            body.to_string()
        };
        hex::decode(&padded).map_err(|_| LedgerError::InvalidObjectId { id: id.to_string() })?;

        Ok(Self(id.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction digest returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxDigest(pub String);

impl TxDigest {
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount in base units (1 USDO = 1_000_000_000 base units)
pub type Amount = u64;

/// Constants
pub mod constants {
    use super::Amount;

    /// Decimal places of USDO and the outcome coins
    pub const USDO_DECIMALS: u32 = 9;

    /// 1 USDO in base units
    pub const BASE_UNITS_PER_USDO: Amount = 1_000_000_000;

    /// Basis points in 100%
    pub const BPS_DENOMINATOR: u32 = 10_000;
}
