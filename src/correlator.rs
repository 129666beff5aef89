//! Matches a decoded `Initiation` event to its companion `MessageSent` log in
//! the same transaction receipt, and turns the pair into a [`PendingTransfer`].

use alloy_primitives::keccak256;
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use std::time::Instant;
use tracing::{info, warn};

use crate::chain::ChainRegistry;
use crate::contracts::MessageSent;
use crate::error::CorrelationError;
use crate::store::{InitiationEvent, PendingStore, PendingTransfer, TransferState};

/// Locates the `MessageSent` log among `receipt_logs` and correlates it with
/// `event`, inserting a new [`PendingTransfer`] into `store` on success.
///
/// Returns `Ok(true)` if a new entry was inserted, `Ok(false)` if the event
/// was already known (idempotent re-observation), and `Err` for a classified
/// failure the caller should log and skip — the scanner still advances past
/// the event in either case.
pub async fn correlate(
    event: InitiationEvent,
    receipt_logs: &[Log],
    message_transmitter: alloy_primitives::Address,
    registry: &ChainRegistry,
    store: &PendingStore,
) -> Result<bool, CorrelationError> {
    let message_bytes = find_message_sent(receipt_logs, message_transmitter)?;
    let message_hash = keccak256(&message_bytes);

    let destination = registry
        .config(event.destination_domain)
        .ok_or(CorrelationError::UnknownDestination(event.destination_domain))?;
    let destination_transmitter = destination.message_transmitter_address;

    let now = Instant::now();
    let transfer = PendingTransfer {
        source_domain: event.source_domain,
        destination_domain: event.destination_domain,
        burn_nonce: event.burn_nonce,
        message_hash,
        message_bytes: message_bytes.into(),
        destination_transmitter,
        enqueued_at: now,
        retries: 0,
        last_attempt_at: now,
        state: TransferState::Attesting,
    };

    let inserted = store.insert_if_absent(transfer).await;
    if inserted {
        info!(
            source_domain = event.source_domain,
            burn_nonce = event.burn_nonce,
            destination_domain = event.destination_domain,
            message_hash = %message_hash,
            amount = %event.amount,
            recipient_commitment = %event.recipient_commitment,
            nullifier = %event.nullifier,
            "correlated transfer"
        );
    } else {
        warn!(
            source_domain = event.source_domain,
            burn_nonce = event.burn_nonce,
            "transfer already known, skipping re-observation"
        );
    }
    Ok(inserted)
}

/// Finds the first log emitted by `message_transmitter` whose topic0 matches
/// `MessageSent(bytes)`, and decodes its payload.
fn find_message_sent(
    logs: &[Log],
    message_transmitter: alloy_primitives::Address,
) -> Result<Vec<u8>, CorrelationError> {
    let log = logs
        .iter()
        .find(|log| {
            log.address() == message_transmitter
                && log
                    .topics()
                    .first()
                    .is_some_and(|topic| *topic == MessageSent::SIGNATURE_HASH)
        })
        .ok_or(CorrelationError::CorrelationMissing)?;

    let decoded =
        MessageSent::abi_decode_data(&log.data().data).map_err(|_| CorrelationError::CorrelationMissing)?;
    Ok(decoded.0.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConnector;
    use crate::config::ChainConfig;
    use alloy_primitives::{Address, Bytes, B256, U256};
    use alloy_sol_types::SolEvent;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    fn chain_config(domain_id: u32) -> ChainConfig {
        ChainConfig {
            chain_id: 1,
            display_name: "test".to_string(),
            domain_id,
            rpc_url: "http://localhost:8545".parse().unwrap(),
            bridge_address: None,
            message_transmitter_address: Address::repeat_byte(0x22),
            event_filtering_supported: true,
            confirmations: 0,
            poll_interval: Duration::from_secs(1),
            max_lookback: 10,
        }
    }

    struct UnusedConnector;
    #[async_trait]
    impl ChainConnector for UnusedConnector {
        fn domain_id(&self) -> u32 {
            0
        }
        async fn head_block(&self) -> Result<u64, crate::error::ChainError> {
            unimplemented!()
        }
        async fn get_logs(
            &self,
            _: Address,
            _: B256,
            _: u64,
            _: u64,
        ) -> Result<Vec<Log>, crate::error::ChainError> {
            unimplemented!()
        }
        async fn get_receipt(
            &self,
            _: B256,
        ) -> Result<Option<crate::chain::Receipt>, crate::error::ChainError> {
            unimplemented!()
        }
        async fn suggest_fees(&self) -> Result<crate::chain::FeeEstimate, crate::error::ChainError> {
            unimplemented!()
        }
        async fn send_and_wait(
            &self,
            _: Address,
            _: Bytes,
            _: u64,
            _: crate::chain::FeeEstimate,
            _: u64,
            _: Duration,
        ) -> Result<crate::chain::TxOutcome, crate::error::ChainError> {
            unimplemented!()
        }
    }

    fn sample_event(destination_domain: u32) -> InitiationEvent {
        InitiationEvent {
            burn_nonce: 42,
            metadata_nonce: 0,
            destination_domain,
            recipient_commitment: B256::repeat_byte(0x01),
            amount: U256::from(100u64),
            nullifier: B256::repeat_byte(0x02),
            source_domain: 6,
            source_tx_hash: B256::repeat_byte(0x03),
            source_block_number: 100,
            log_index: 0,
        }
    }

    /// Builds the ABI encoding of a single dynamic `bytes` argument as it
    /// appears in non-indexed event data: a 32-byte offset, a 32-byte
    /// length, then the payload padded to a 32-byte boundary.
    fn encode_bytes_event_data(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 31];
        out.push(0x20);
        let mut len_word = [0u8; 32];
        len_word[24..].copy_from_slice(&(payload.len() as u64).to_be_bytes());
        out.extend_from_slice(&len_word);
        out.extend_from_slice(payload);
        let pad = (32 - (payload.len() % 32)) % 32;
        out.extend(std::iter::repeat(0u8).take(pad));
        out
    }

    fn message_sent_log(transmitter: Address, payload: &[u8]) -> Log {
        let data = Bytes::from(encode_bytes_event_data(payload));
        let log_data = alloy_primitives::LogData::new_unchecked(vec![MessageSent::SIGNATURE_HASH], data);
        let inner = alloy_primitives::Log { address: transmitter, data: log_data };
        Log {
            inner,
            block_hash: None,
            block_number: Some(100),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: Some(0),
            removed: false,
        }
    }

    #[tokio::test]
    async fn unknown_destination_is_classified() {
        let store = PendingStore::new();
        let registry = ChainRegistry::new(
            vec![chain_config(6)],
            vec![Arc::new(UnusedConnector) as Arc<dyn ChainConnector>],
        );
        let logs = vec![message_sent_log(Address::repeat_byte(0x22), b"payload")];
        let result = correlate(
            sample_event(99),
            &logs,
            Address::repeat_byte(0x22),
            &registry,
            &store,
        )
        .await;
        assert!(matches!(result, Err(CorrelationError::UnknownDestination(99))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn missing_message_sent_log_is_classified() {
        let store = PendingStore::new();
        let registry = ChainRegistry::new(
            vec![chain_config(6), chain_config(0)],
            vec![Arc::new(UnusedConnector) as Arc<dyn ChainConnector>],
        );
        let logs = vec![message_sent_log(Address::repeat_byte(0x99), b"payload")];
        let result = correlate(
            sample_event(0),
            &logs,
            Address::repeat_byte(0x22),
            &registry,
            &store,
        )
        .await;
        assert!(matches!(result, Err(CorrelationError::CorrelationMissing)));
    }

    #[tokio::test]
    async fn correlated_transfer_has_matching_hash_and_is_idempotent() {
        let store = PendingStore::new();
        let registry = ChainRegistry::new(
            vec![chain_config(6), chain_config(0)],
            vec![Arc::new(UnusedConnector) as Arc<dyn ChainConnector>],
        );
        let logs = vec![message_sent_log(Address::repeat_byte(0x22), b"payload")];
        let inserted = correlate(sample_event(0), &logs, Address::repeat_byte(0x22), &registry, &store)
            .await
            .unwrap();
        assert!(inserted);
        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].message_hash, keccak256(b"payload"));

        let inserted_again =
            correlate(sample_event(0), &logs, Address::repeat_byte(0x22), &registry, &store)
                .await
                .unwrap();
        assert!(!inserted_again);
        assert_eq!(store.len().await, 1);
    }
}
