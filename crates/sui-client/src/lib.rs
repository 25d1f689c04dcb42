//! sui-client: JSON-RPC client for the market ledger
//!
//! Thin typed wrapper over the fullnode JSON-RPC API: object reads, coin
//! balances and transaction execution. Every request is bounded by the
//! configured timeout so callers can tell "failed" from "unknown outcome".

pub mod rpc;
pub mod signer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use corner_core::{Address, Amount, LedgerConfig, LedgerError, ObjectId, TxDigest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use rpc::{RpcRequest, RpcResponse};
pub use signer::{MoveArg, MoveCall, RemoteSigner, TransactionSigner};

/// Result type for ledger client operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Outcome of an executed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub digest: TxDigest,
    /// False when produced by the in-memory simulator
    pub on_ledger: bool,
}

impl TxReceipt {
    pub fn on_ledger(digest: impl Into<String>) -> Self {
        Self {
            digest: TxDigest::new(digest),
            on_ledger: true,
        }
    }

    pub fn simulated(digest: impl Into<String>) -> Self {
        Self {
            digest: TxDigest::new(digest),
            on_ledger: false,
        }
    }
}

/// High-level ledger client
#[derive(Clone)]
pub struct SuiClient {
    http: reqwest::Client,
    config: LedgerConfig,
    next_id: Arc<AtomicU64>,
}

impl SuiClient {
    /// Create a new client. No request is made until the first call.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("open-corner")
            .build()
            .map_err(|e| LedgerError::Unreachable {
                url: format!("{}: {}", config.rpc_url, e),
            })?;

        Ok(Self {
            http,
            config,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Get the current ledger configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Issue a raw JSON-RPC call
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);

        tracing::debug!("RPC {} (id {})", method, id);

        let response = timed_request(
            self.timeout(),
            self.http.post(&self.config.rpc_url).json(&request).send(),
        )
        .await?
        .map_err(|e| map_transport_error(&self.config, e))?;

        let envelope: RpcResponse = timed_request(self.timeout(), response.json())
            .await?
            .map_err(|e| LedgerError::ParseError(e.to_string()))?;

        envelope.into_result()
    }

    /// Fetch an object's Move fields (`data.content.fields`)
    pub async fn get_object_fields(&self, id: &ObjectId) -> Result<Value> {
        let result = self
            .call(
                "sui_getObject",
                json!([id.as_str(), { "showContent": true, "showType": true }]),
            )
            .await?;

        extract_fields(id, result)
    }

    /// Total balance of a coin type held by an address
    pub async fn get_balance(&self, owner: &Address, coin_type: &str) -> Result<Amount> {
        let result = self
            .call("suix_getBalance", json!([owner.as_str(), coin_type]))
            .await?;

        parse_total_balance(&result)
    }
}

/// Pull `data.content.fields` out of a `sui_getObject` result
pub fn extract_fields(id: &ObjectId, result: Value) -> Result<Value> {
    if result.get("error").is_some_and(|e| !e.is_null()) {
        return Err(LedgerError::ObjectNotFound {
            id: id.to_string(),
        });
    }

    result
        .get("data")
        .and_then(|d| d.get("content"))
        .and_then(|c| c.get("fields"))
        .cloned()
        .ok_or_else(|| LedgerError::ParseError(format!("object {} has no Move fields", id)))
}

/// Parse `totalBalance` (a decimal string) from a `suix_getBalance` result
pub fn parse_total_balance(result: &Value) -> Result<Amount> {
    let raw = result
        .get("totalBalance")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::ParseError("missing totalBalance".into()))?;

    // totalBalance is u128 on the ledger; anything above u64 cannot be a USDO amount
    raw.parse::<Amount>()
        .map_err(|e| LedgerError::ParseError(format!("totalBalance {:?}: {}", raw, e)))
}

/// Turn an execution result into a receipt, failing on a non-success status
pub fn parse_execution_result(result: &Value) -> Result<TxReceipt> {
    let digest = result
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::ParseError("missing digest".into()))?;

    let status = result
        .pointer("/effects/status/status")
        .and_then(Value::as_str)
        .unwrap_or("success");

    if status != "success" {
        let message = result
            .pointer("/effects/status/error")
            .and_then(Value::as_str)
            .unwrap_or("execution failed")
            .to_string();
        return Err(LedgerError::Rejected { message });
    }

    Ok(TxReceipt::on_ledger(digest))
}

fn map_transport_error(config: &LedgerConfig, e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout {
            secs: config.request_timeout_secs,
        }
    } else {
        LedgerError::Unreachable {
            url: format!("{}: {}", config.rpc_url, e),
        }
    }
}

/// Wrap a ledger request with a timeout.
async fn timed_request<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = T>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| LedgerError::Timeout {
            secs: timeout.as_secs(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_id() -> ObjectId {
        ObjectId::parse("0x1234").unwrap()
    }

    #[test]
    fn test_extract_fields() {
        let result = json!({
            "data": {
                "objectId": "0x1234",
                "content": {
                    "dataType": "moveObject",
                    "fields": { "k": "2500" }
                }
            }
        });
        let fields = extract_fields(&pool_id(), result).unwrap();
        assert_eq!(fields["k"], "2500");
    }

    #[test]
    fn test_extract_fields_not_found() {
        let result = json!({ "error": { "code": "notExists", "object_id": "0x1234" } });
        assert!(matches!(
            extract_fields(&pool_id(), result),
            Err(LedgerError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_extract_fields_without_content() {
        let result = json!({ "data": { "objectId": "0x1234" } });
        assert!(matches!(
            extract_fields(&pool_id(), result),
            Err(LedgerError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_total_balance() {
        let result = json!({ "coinType": "0x2::usdo::USDO", "totalBalance": "10000000000000" });
        assert_eq!(parse_total_balance(&result).unwrap(), 10_000_000_000_000);

        let result = json!({ "totalBalance": 12 });
        assert!(parse_total_balance(&result).is_err());
    }

    #[test]
    fn test_parse_execution_result() {
        let ok = json!({ "digest": "9xYz", "effects": { "status": { "status": "success" } } });
        let receipt = parse_execution_result(&ok).unwrap();
        assert_eq!(receipt.digest.as_str(), "9xYz");
        assert!(receipt.on_ledger);

        let failed = json!({
            "digest": "9xYz",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(3)" } }
        });
        match parse_execution_result(&failed) {
            Err(LedgerError::Rejected { message }) => assert_eq!(message, "MoveAbort(3)"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timed_request_times_out() {
        let result = timed_request(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Timeout { .. })));
    }
}
