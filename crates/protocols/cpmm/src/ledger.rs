//! Ledger integration
//!
//! The authoritative source of pool state: reads pools and market status
//! from the ledger and submits signed operations to it.

use std::future::Future;
use std::time::Duration;

use corner_core::{Address, Amount, LedgerConfig, LedgerError, MarketId, ObjectId};
use sui_client::{RemoteSigner, SuiClient, TransactionSigner, TxReceipt};

use crate::constants::{coin_type, coin_types};
use crate::fetch::{parse_market, parse_pool, MarketRecord};
use crate::state::{MarketStatus, Operation, Pool};
use crate::tx_builder::build_move_call;

/// Capability to read and mutate pools on the external ledger
pub trait PoolLedger: Send + Sync {
    /// Current pool of a market
    fn fetch_pool(&self, market_id: &MarketId)
        -> impl Future<Output = Result<Pool, LedgerError>> + Send;

    /// Lifecycle status of a market
    fn fetch_market_state(
        &self,
        market_id: &MarketId,
    ) -> impl Future<Output = Result<MarketStatus, LedgerError>> + Send;

    /// USDO held by an address
    fn fetch_collateral_balance(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Amount, LedgerError>> + Send;

    /// Sign and execute `operation` for `sender`.
    ///
    /// `LedgerError::Timeout` means the transaction may still land.
    fn submit(
        &self,
        sender: &Address,
        market_id: &MarketId,
        operation: &Operation,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;
}

/// [`PoolLedger`] over the fullnode RPC and a remote wallet signer
#[derive(Clone)]
pub struct SuiLedger {
    client: SuiClient,
    signer: Option<RemoteSigner>,
}

impl SuiLedger {
    pub fn new(client: SuiClient, signer: Option<RemoteSigner>) -> Self {
        Self { client, signer }
    }

    /// Build the client, plus a signer when `signer_url` is set
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let client = SuiClient::new(config.clone())?;
        let signer = config
            .signer_url
            .as_ref()
            .map(|url| {
                RemoteSigner::new(
                    url.clone(),
                    Duration::from_secs(config.request_timeout_secs),
                )
            })
            .transpose()?;

        Ok(Self::new(client, signer))
    }

    pub fn client(&self) -> &SuiClient {
        &self.client
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    async fn market_record(
        &self,
        market_id: &MarketId,
    ) -> Result<(ObjectId, MarketRecord), LedgerError> {
        let id = ObjectId::parse(market_id.as_str())?;
        let fields = self.client.get_object_fields(&id).await?;
        let record = parse_market(&fields)?;
        Ok((id, record))
    }
}

impl PoolLedger for SuiLedger {
    async fn fetch_pool(&self, market_id: &MarketId) -> Result<Pool, LedgerError> {
        let (_, record) = self.market_record(market_id).await?;
        let fields = self.client.get_object_fields(&record.pool_id).await?;
        parse_pool(market_id, &fields)
    }

    async fn fetch_market_state(&self, market_id: &MarketId) -> Result<MarketStatus, LedgerError> {
        let (_, record) = self.market_record(market_id).await?;
        Ok(record.status)
    }

    async fn fetch_collateral_balance(&self, owner: &Address) -> Result<Amount, LedgerError> {
        let usdo = coin_type(&self.client.config().package_id, coin_types::USDO);
        self.client.get_balance(owner, &usdo).await
    }

    async fn submit(
        &self,
        sender: &Address,
        market_id: &MarketId,
        operation: &Operation,
    ) -> Result<TxReceipt, LedgerError> {
        let signer = self.signer.as_ref().ok_or(LedgerError::SignerUnavailable)?;

        let (id, record) = self.market_record(market_id).await?;
        let built = build_move_call(&self.client.config().package_id, &id, &record, operation)?;

        tracing::info!(
            "Submitting {} on {} for {} (inputs {:?}, min_out {:?})",
            built.summary.function,
            market_id,
            sender,
            built.summary.inputs,
            built.summary.min_out
        );

        let receipt = signer.sign_and_execute(sender, &built.call).await?;
        tracing::info!("{} landed: {}", built.summary.function, receipt.digest);
        Ok(receipt)
    }
}
