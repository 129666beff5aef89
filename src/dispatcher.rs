//! Submits `receiveMessage` to a destination chain and classifies the
//! outcome.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use std::time::Duration;
use tracing::{info, warn};

use crate::chain::{ChainConnector, FeeEstimate};
use crate::contracts::IMessageTransmitter;
use crate::error::{ChainError, DispatchError};

/// A floor applied to the priority fee so L2s that suggest a zero priority
/// fee still submit a transaction miners will include promptly.
const MIN_PRIORITY_FEE_WEI: u128 = 1_000_000_000; // 1 gwei
const FEE_MULTIPLIER: u128 = 2;

/// The caller-facing result of a dispatch attempt, already folded through
/// the duplicate-delivery classification.
pub enum DispatchOutcome {
    Delivered { tx_hash: B256 },
    Failed { reason: String },
}

/// Submits `receiveMessage(message, attestation)` to `transmitter` on the
/// chain behind `connector`, waits for confirmation, and classifies the
/// result.
pub async fn dispatch(
    connector: &dyn ChainConnector,
    transmitter: Address,
    message: Bytes,
    attestation: Bytes,
    gas_limit: u64,
    confirmations: u64,
    timeout: Duration,
) -> DispatchOutcome {
    let calldata = IMessageTransmitter::receiveMessageCall { message, attestation }.abi_encode();

    let fees = match connector.suggest_fees().await {
        Ok(fees) => boosted_fees(fees),
        Err(e) => {
            return DispatchOutcome::Failed { reason: format!("fee suggestion failed: {e}") };
        }
    };

    match connector
        .send_and_wait(transmitter, calldata.into(), gas_limit, fees, confirmations, timeout)
        .await
    {
        Ok(outcome) => classify_receipt(outcome),
        Err(ChainError::ConfirmTimeout(tx_hash)) => {
            warn!(tx_hash = %tx_hash, "dispatch confirmation timed out");
            DispatchOutcome::Failed { reason: DispatchError::ConfirmTimeout.to_string() }
        }
        Err(e) => {
            let dispatch_err = DispatchError::Transport(e.to_string());
            warn!(error = %dispatch_err, "dispatch transport error");
            DispatchOutcome::Failed { reason: dispatch_err.to_string() }
        }
    }
}

fn boosted_fees(fees: FeeEstimate) -> FeeEstimate {
    FeeEstimate {
        max_fee_per_gas: fees.max_fee_per_gas.saturating_mul(FEE_MULTIPLIER),
        max_priority_fee_per_gas: fees
            .max_priority_fee_per_gas
            .saturating_mul(FEE_MULTIPLIER)
            .max(MIN_PRIORITY_FEE_WEI),
    }
}

fn classify_receipt(outcome: crate::chain::TxOutcome) -> DispatchOutcome {
    if outcome.status {
        info!(tx_hash = %outcome.tx_hash, "receive_message succeeded");
        return DispatchOutcome::Delivered { tx_hash: outcome.tx_hash };
    }

    let reason = outcome
        .revert_reason
        .unwrap_or_else(|| format!("transaction {:#x} reverted with no decodable reason", outcome.tx_hash));
    let dispatch_err = DispatchError::Revert(reason.clone());
    if dispatch_err.is_duplicate() {
        info!(tx_hash = %outcome.tx_hash, "message already relayed by another party, treating as delivered");
        DispatchOutcome::Delivered { tx_hash: outcome.tx_hash }
    } else {
        DispatchOutcome::Failed { reason }
    }
}
