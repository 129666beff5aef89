//! Production [`ChainConnector`] backed by `alloy-provider`.

use alloy_network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types_eth::{Filter, Log, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{ChainConnector, FeeEstimate, Receipt, TxOutcome};
use crate::error::ChainError;

type InnerFiller = JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>;
type InnerProvider =
    FillProvider<JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>, RootProvider, Ethereum>;

/// Wraps a single `alloy` RPC connection and signing key for one chain.
pub struct AlloyChainConnector {
    domain_id: u32,
    display_name: String,
    provider: InnerProvider,
}

impl AlloyChainConnector {
    /// Connects to `rpc_url` and binds `signer` as the sole transaction
    /// sender. The signer is cloned and pinned to `chain_id` so every
    /// transaction carries the correct replay-protection value even if the
    /// RPC endpoint is shared across environments.
    pub fn connect(
        domain_id: u32,
        display_name: String,
        chain_id: u64,
        rpc_url: url::Url,
        signer: &PrivateKeySigner,
    ) -> Self {
        let signer = signer.clone().with_chain_id(Some(chain_id));
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url);
        Self { domain_id, display_name, provider }
    }
}

impl AlloyChainConnector {
    /// Re-runs a reverted transaction as an `eth_call` at the block it was
    /// mined in to recover the decoded revert reason. Ordinary receipts
    /// carry only a success/failure status, not the reason string.
    async fn simulate_revert_reason(
        &self,
        txr: TransactionRequest,
        block_number: Option<u64>,
    ) -> Option<String> {
        let block = block_number.map(alloy_rpc_types_eth::BlockId::number);
        let mut call = self.provider.call(&txr);
        if let Some(block) = block {
            call = call.block(block);
        }
        match call.await {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        }
    }
}

#[async_trait]
impl ChainConnector for AlloyChainConnector {
    fn domain_id(&self) -> u32 {
        self.domain_id
    }

    #[instrument(skip(self), fields(chain = %self.display_name))]
    async fn head_block(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))
    }

    #[instrument(skip(self), fields(chain = %self.display_name, from_block, to_block))]
    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .address(address)
            .event_signature(topic0)
            .from_block(from_block)
            .to_block(to_block);
        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))
    }

    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        Ok(receipt.map(|r| Receipt {
            logs: r.inner.logs().to_vec(),
            block_number: r.block_number.unwrap_or(0),
            status: r.status(),
        }))
    }

    async fn suggest_fees(&self) -> Result<FeeEstimate, ChainError> {
        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        Ok(FeeEstimate {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }

    #[instrument(skip(self, calldata, fees), fields(chain = %self.display_name, to = %to))]
    async fn send_and_wait(
        &self,
        to: Address,
        calldata: Bytes,
        gas_limit: u64,
        fees: FeeEstimate,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TxOutcome, ChainError> {
        let txr = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata)
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let pending = self
            .provider
            .send_transaction(txr.clone())
            .await
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "submitted dispatch transaction");

        let receipt = pending
            .with_required_confirmations(confirmations)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|_| ChainError::ConfirmTimeout(tx_hash))?;

        let revert_reason = if receipt.status() {
            None
        } else {
            self.simulate_revert_reason(txr, receipt.block_number).await
        };

        info!(tx_hash = %tx_hash, status = receipt.status(), "dispatch transaction confirmed");
        Ok(TxOutcome { tx_hash, status: receipt.status(), revert_reason })
    }
}
