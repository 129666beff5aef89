//! Blockchain RPC access behind a trait, so the scanner, correlator, and
//! dispatcher can be tested against fakes instead of live chains.

mod alloy_connector;

pub use alloy_connector::AlloyChainConnector;

use alloy_primitives::{Address, Bytes, B256};
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ChainConfig;
use crate::error::ChainError;

/// A suggested EIP-1559 fee pair: base/priority components a dispatcher can
/// scale before submitting a transaction.
#[derive(Debug, Clone, Copy)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// A mined transaction's receipt, reduced to the fields the pipeline reads:
/// the logs it emitted, the block it was mined in, and its success status.
/// Deliberately not the full `alloy_rpc_types_eth::TransactionReceipt`
/// envelope, so connector implementations can be faked without constructing a
/// real consensus receipt.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub logs: Vec<Log>,
    pub block_number: u64,
    pub status: bool,
}

/// The result of broadcasting and waiting on a transaction.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub status: bool,
    /// Populated by re-simulating the call at the mined block when `status`
    /// is failure — ordinary JSON-RPC receipts don't carry a revert reason,
    /// only a boolean status.
    pub revert_reason: Option<String>,
}

/// RPC operations the rest of the pipeline needs from a single chain.
///
/// Every method returns a [`ChainError`] so callers can distinguish transient
/// failures (worth retrying) from permanent ones without inspecting error
/// strings.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// The CCTP domain id this connector serves.
    fn domain_id(&self) -> u32;

    /// The latest block number visible to this connector.
    async fn head_block(&self) -> Result<u64, ChainError>;

    /// Fetches logs emitted by `address` in `[from_block, to_block]` matching
    /// `topic0`. Implementations that cannot filter server-side (per
    /// [`ChainConfig::event_filtering_supported`]) should never be called —
    /// the scanner skips such chains entirely.
    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ChainError>;

    /// Fetches the receipt for a transaction, used to locate the companion
    /// log emitted in the same transaction as a bridge event.
    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, ChainError>;

    /// Suggests fee parameters for a new transaction.
    async fn suggest_fees(&self) -> Result<FeeEstimate, ChainError>;

    /// Submits a call to `to` with `calldata`, waits for it to be mined, and
    /// returns the receipt. `gas_limit` and `fees` are supplied by the
    /// dispatcher; `confirmations` comes from the destination chain's
    /// configuration.
    async fn send_and_wait(
        &self,
        to: Address,
        calldata: Bytes,
        gas_limit: u64,
        fees: FeeEstimate,
        confirmations: u64,
        timeout: std::time::Duration,
    ) -> Result<TxOutcome, ChainError>;
}

/// Connectors keyed by CCTP domain id, built once at startup from
/// [`ChainConfig`].
pub struct ChainRegistry {
    connectors: HashMap<u32, Arc<dyn ChainConnector>>,
    configs: HashMap<u32, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(configs: Vec<ChainConfig>, connectors: Vec<Arc<dyn ChainConnector>>) -> Self {
        let configs = configs.into_iter().map(|c| (c.domain_id, c)).collect();
        let connectors = connectors.into_iter().map(|c| (c.domain_id(), c)).collect();
        Self { connectors, configs }
    }

    pub fn get(&self, domain_id: u32) -> Option<Arc<dyn ChainConnector>> {
        self.connectors.get(&domain_id).cloned()
    }

    pub fn config(&self, domain_id: u32) -> Option<&ChainConfig> {
        self.configs.get(&domain_id)
    }

    pub fn domains(&self) -> impl Iterator<Item = u32> + '_ {
        self.connectors.keys().copied()
    }

    pub fn configs(&self) -> impl Iterator<Item = &ChainConfig> {
        self.configs.values()
    }
}
