//! Per-source-chain block scanning loop.
//!
//! Each enabled source chain runs its own cooperative task, advancing a
//! locally-owned `last_processed_block` cursor as it discovers and
//! correlates `Initiation` events.

use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::{ChainConnector, ChainRegistry};
use crate::config::ChainConfig;
use crate::contracts::Initiation;
use crate::correlator::correlate;
use crate::store::{InitiationEvent, PendingStore};

/// Runs the scan loop for a single source chain until `shutdown` fires.
///
/// `last_processed_block` is seeded from the confirmed head
/// (`head_block().saturating_sub(confirmations).saturating_sub(max_lookback)`)
/// so restarts re-observe a bounded lookback window rather than starting from
/// genesis, and every tick scans only up to the confirmed head so a
/// short reorg can't retroactively invalidate an already-processed block.
pub async fn run(
    chain: ChainConfig,
    connector: Arc<dyn ChainConnector>,
    registry: Arc<ChainRegistry>,
    store: Arc<PendingStore>,
    chunk_size: u64,
    running: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    let Some(bridge_address) = chain.bridge_address else {
        warn!(chain = %chain.display_name, "scanner started for a chain with no bridge_address, exiting");
        return;
    };

    let mut last_processed = match seed_last_processed(&connector, chain.confirmations, chain.max_lookback).await {
        Ok(block) => block,
        Err(()) => return,
    };
    info!(chain = %chain.display_name, last_processed, "scanner started");

    let mut ticker = tokio::time::interval(chain.poll_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(chain = %chain.display_name, "scanner shutting down");
                return;
            }
            _ = ticker.tick() => {
                if !running.load(Ordering::SeqCst) {
                    continue;
                }
                match tick(&chain, &connector, &registry, &store, bridge_address, last_processed, chunk_size).await {
                    Some(new_last) => last_processed = new_last,
                    None => {
                        // Logged inside `tick`; next tick retries the same window.
                    }
                }
            }
        }
    }
}

async fn seed_last_processed(
    connector: &Arc<dyn ChainConnector>,
    confirmations: u64,
    max_lookback: u64,
) -> Result<u64, ()> {
    match connector.head_block().await {
        Ok(head) => Ok(head.saturating_sub(confirmations).saturating_sub(max_lookback)),
        Err(e) => {
            error!(error = %e, "failed to probe head block while seeding scanner, not starting");
            Err(())
        }
    }
}

/// Runs a single scan tick, returning the new `last_processed_block` on
/// success. On any failure the window is left untouched so the next tick
/// retries it in full.
async fn tick(
    chain: &ChainConfig,
    connector: &Arc<dyn ChainConnector>,
    registry: &Arc<ChainRegistry>,
    store: &Arc<PendingStore>,
    bridge_address: Address,
    last_processed: u64,
    chunk_size: u64,
) -> Option<u64> {
    let head = match connector.head_block().await {
        Ok(head) => head.saturating_sub(chain.confirmations),
        Err(e) => {
            error!(chain = %chain.display_name, error = %e, "head_block failed, retrying next tick");
            return None;
        }
    };
    if head <= last_processed {
        return Some(last_processed);
    }

    let from = last_processed + 1;
    let to = head.min(last_processed + chunk_size);

    let logs = match connector
        .get_logs(bridge_address, Initiation::SIGNATURE_HASH, from, to)
        .await
    {
        Ok(logs) => logs,
        Err(e) => {
            error!(chain = %chain.display_name, from, to, error = %e, "get_logs failed, retrying next tick");
            return None;
        }
    };

    let mut ordered = logs;
    ordered.sort_by_key(|log| (log.block_number.unwrap_or(0), log.log_index.unwrap_or(0)));

    let mut receipts_by_tx = HashMap::new();
    for log in &ordered {
        let Some(tx_hash) = log.transaction_hash else {
            continue;
        };
        let decoded = match Initiation::decode_raw_log(log.topics().iter().copied(), &log.data().data) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(chain = %chain.display_name, tx_hash = %tx_hash, error = %e, "failed to decode Initiation log, retrying next tick");
                return None;
            }
        };

        if !receipts_by_tx.contains_key(&tx_hash) {
            let receipt = match connector.get_receipt(tx_hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    error!(chain = %chain.display_name, tx_hash = %tx_hash, "receipt not yet available for a mined log, retrying next tick");
                    return None;
                }
                Err(e) => {
                    error!(chain = %chain.display_name, tx_hash = %tx_hash, error = %e, "get_receipt failed, retrying next tick");
                    return None;
                }
            };
            receipts_by_tx.insert(tx_hash, receipt);
        }
        let receipt = receipts_by_tx.get(&tx_hash).expect("just inserted");

        let event = InitiationEvent {
            burn_nonce: decoded.burn_nonce,
            metadata_nonce: decoded.metadata_nonce,
            destination_domain: decoded.destination_domain,
            recipient_commitment: decoded.recipient_commitment,
            amount: decoded.amount,
            nullifier: decoded.nullifier,
            source_domain: chain.domain_id,
            source_tx_hash: tx_hash,
            source_block_number: log.block_number.unwrap_or(0),
            log_index: log.log_index.unwrap_or(0),
        };

        match correlate(
            event,
            &receipt.logs,
            chain.message_transmitter_address,
            registry,
            store,
        )
        .await
        {
            Ok(_) => {}
            Err(e) => {
                error!(chain = %chain.display_name, tx_hash = %tx_hash, error = %e, "dropping event");
            }
        }
    }

    Some(to)
}
