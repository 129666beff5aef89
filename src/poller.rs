//! The attestation poller: the single task that owns every pending
//! transfer's retry count, state, and store membership.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::attestation::AttestationClient;
use crate::chain::ChainRegistry;
use crate::dispatcher::{dispatch, DispatchOutcome};
use crate::store::{PendingStore, PendingTransfer, TransferState};

/// Per-destination-domain submission locks: held for the duration of a
/// dispatch so at most one `send_and_wait` is ever outstanding against a
/// given destination chain, while dispatches to distinct destinations
/// proceed concurrently.
type DispatchLocks = StdMutex<HashMap<u32, Arc<AsyncMutex<()>>>>;

fn lock_for_domain(locks: &DispatchLocks, domain_id: u32) -> Arc<AsyncMutex<()>> {
    locks.lock().unwrap().entry(domain_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Runs the poll loop until `shutdown` fires.
pub async fn run(
    store: Arc<PendingStore>,
    registry: Arc<ChainRegistry>,
    attestation_client: Arc<dyn AttestationClient>,
    poll_interval: Duration,
    max_poll_retries: u32,
    dispatch_timeout: Duration,
    dispatch_gas_limit: u64,
    running: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    let dispatch_locks: Arc<DispatchLocks> = Arc::new(StdMutex::new(HashMap::new()));
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("attestation poller shutting down");
                return;
            }
            _ = ticker.tick() => {
                if !running.load(Ordering::SeqCst) {
                    continue;
                }
                tick(
                    &store,
                    &registry,
                    &attestation_client,
                    &dispatch_locks,
                    max_poll_retries,
                    dispatch_timeout,
                    dispatch_gas_limit,
                )
                .await;
            }
        }
    }
}

async fn tick(
    store: &Arc<PendingStore>,
    registry: &Arc<ChainRegistry>,
    attestation_client: &Arc<dyn AttestationClient>,
    dispatch_locks: &Arc<DispatchLocks>,
    max_poll_retries: u32,
    dispatch_timeout: Duration,
    dispatch_gas_limit: u64,
) {
    // Snapshot first: the store may change concurrently (new scanner
    // inserts) while this tick is in flight.
    let mut dispatches = Vec::new();
    for transfer in store.snapshot().await {
        let key = transfer.key();

        if transfer.state != TransferState::Attesting {
            // Left mid-dispatch by a prior tick that never reached its
            // terminal transition; not expected in normal operation, skip.
            continue;
        }

        if transfer.retries >= max_poll_retries {
            store.remove(key).await;
            warn!(
                source_domain = transfer.source_domain,
                burn_nonce = transfer.burn_nonce,
                retries = transfer.retries,
                "attestation retries exhausted, giving up"
            );
            continue;
        }

        let response = attestation_client.get_attestation(transfer.message_hash).await;
        match response {
            Some(response) if response.is_ready() => {
                store.update(key, |t| t.state = TransferState::Relaying).await;
                dispatches.push((transfer, response.attestation.expect("checked ready")));
            }
            _ => {
                store
                    .update(key, |t| {
                        t.retries += 1;
                        t.last_attempt_at = Instant::now();
                    })
                    .await;
            }
        }
    }

    // Every ready transfer dispatches concurrently; per-destination-domain
    // locks inside `handle_ready` serialize submissions that share a chain.
    let handles: Vec<_> = dispatches
        .into_iter()
        .map(|(transfer, attestation)| {
            let store = store.clone();
            let registry = registry.clone();
            let dispatch_locks = dispatch_locks.clone();
            tokio::spawn(async move {
                handle_ready(&store, &registry, &dispatch_locks, transfer, attestation, dispatch_timeout, dispatch_gas_limit).await;
            })
        })
        .collect();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "dispatch task panicked");
        }
    }
}

async fn handle_ready(
    store: &Arc<PendingStore>,
    registry: &Arc<ChainRegistry>,
    dispatch_locks: &Arc<DispatchLocks>,
    transfer: PendingTransfer,
    attestation: alloy_primitives::Bytes,
    dispatch_timeout: Duration,
    dispatch_gas_limit: u64,
) {
    let key = transfer.key();

    let Some(connector) = registry.get(transfer.destination_domain) else {
        // Configuration changed mid-flight; nothing useful to do but drop it.
        store.remove(key).await;
        warn!(
            destination_domain = transfer.destination_domain,
            "no connector configured for destination domain at dispatch time"
        );
        return;
    };
    let confirmations = registry.config(transfer.destination_domain).map(|c| c.confirmations).unwrap_or(0);

    let domain_lock = lock_for_domain(dispatch_locks, transfer.destination_domain);
    let _permit = domain_lock.lock().await;

    let outcome = dispatch(
        connector.as_ref(),
        transfer.destination_transmitter,
        transfer.message_bytes.clone(),
        attestation,
        dispatch_gas_limit,
        confirmations,
        dispatch_timeout,
    )
    .await;

    match outcome {
        DispatchOutcome::Delivered { tx_hash } => {
            store.remove(key).await;
            info!(
                source_domain = transfer.source_domain,
                burn_nonce = transfer.burn_nonce,
                tx_hash = %tx_hash,
                "transfer delivered"
            );
        }
        DispatchOutcome::Failed { reason } => {
            store.remove(key).await;
            warn!(
                source_domain = transfer.source_domain,
                burn_nonce = transfer.burn_nonce,
                reason = %reason,
                "dispatch failed, transfer terminally dropped"
            );
        }
    }
}
