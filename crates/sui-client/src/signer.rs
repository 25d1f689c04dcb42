//! Transaction signer capability
//!
//! The engine never holds keys. A signer takes a Move call on behalf of a
//! sender, gets it signed by the sender's wallet and executed, and returns
//! the receipt.

use std::future::Future;
use std::time::Duration;

use corner_core::{Address, Amount, LedgerError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{parse_execution_result, Result, TxReceipt};

/// A single argument to a Move entry function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveArg {
    /// Shared or owned object by ID
    Object { id: String },
    /// Pure u64
    U64 { value: Amount },
    /// A coin of `coin_type` split from the sender's holdings
    Coin { coin_type: String, amount: Amount },
}

/// A Move entry-function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCall {
    /// `package::module::function`
    pub target: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    pub arguments: Vec<MoveArg>,
}

/// Signs and executes transactions for a sender
pub trait TransactionSigner: Send + Sync {
    fn sign_and_execute(
        &self,
        sender: &Address,
        call: &MoveCall,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    sender: &'a Address,
    call: &'a MoveCall,
}

/// Signer backed by a wallet bridge reachable over HTTP.
///
/// The bridge receives `{ sender, call }`, prompts the wallet, executes the
/// signed block and answers with the ledger's execution result.
#[derive(Clone)]
pub struct RemoteSigner {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl RemoteSigner {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .user_agent("open-corner")
            .build()
            .map_err(|e| LedgerError::Unreachable {
                url: format!("{}: {}", url, e),
            })?;
        Ok(Self { http, url, timeout })
    }
}

impl TransactionSigner for RemoteSigner {
    async fn sign_and_execute(&self, sender: &Address, call: &MoveCall) -> Result<TxReceipt> {
        tracing::info!("Requesting signature for {} from {}", call.target, sender);

        let send = self
            .http
            .post(&self.url)
            .json(&SignRequest { sender, call })
            .send();

        // A timeout here means the wallet may still execute the transaction
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LedgerError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| LedgerError::Unreachable {
                url: format!("{}: {}", self.url, e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected {
                message: format!("signer returned {}: {}", status, body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::ParseError(e.to_string()))?;

        parse_execution_result(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_call_serialization() {
        let call = MoveCall {
            target: "0x0::markets::split_usdo_for_market".to_string(),
            type_arguments: vec![],
            arguments: vec![
                MoveArg::Object {
                    id: "0x1".to_string(),
                },
                MoveArg::Coin {
                    coin_type: "0x0::usdo::USDO".to_string(),
                    amount: 5,
                },
            ],
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["arguments"][0]["kind"], "object");
        assert_eq!(json["arguments"][1]["kind"], "coin");
        assert_eq!(json["arguments"][1]["amount"], 5);

        let back: MoveCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
    }
}
