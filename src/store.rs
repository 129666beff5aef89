//! In-memory table of transfers awaiting attestation or relay, and the
//! decoded event types that feed it.

use alloy_primitives::{Address, Bytes, B256};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;

/// A decoded source-chain `Initiation` log. Only `burn_nonce` and
/// `destination_domain` drive routing; the rest is carried for
/// observability.
#[derive(Debug, Clone)]
pub struct InitiationEvent {
    pub burn_nonce: u64,
    pub metadata_nonce: u64,
    pub destination_domain: u32,
    pub recipient_commitment: B256,
    pub amount: alloy_primitives::U256,
    pub nullifier: B256,
    pub source_domain: u32,
    pub source_tx_hash: B256,
    pub source_block_number: u64,
    pub log_index: u64,
}

/// The key identifying a transfer uniquely: the source chain's domain id
/// plus its burn nonce.
pub type TransferKey = (u32, u64);

/// Where a [`PendingTransfer`] sits in its lifecycle. Transitions are owned
/// entirely by the attestation poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Attesting,
    Relaying,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Attesting => "attesting",
            TransferState::Relaying => "relaying",
        }
    }
}

/// A transfer observed on a source chain, in flight toward relay on its
/// destination chain.
#[derive(Debug, Clone)]
pub struct PendingTransfer {
    pub source_domain: u32,
    pub destination_domain: u32,
    pub burn_nonce: u64,
    pub message_hash: B256,
    pub message_bytes: Bytes,
    pub destination_transmitter: Address,
    pub enqueued_at: Instant,
    pub retries: u32,
    pub last_attempt_at: Instant,
    pub state: TransferState,
}

impl PendingTransfer {
    pub fn key(&self) -> TransferKey {
        (self.source_domain, self.burn_nonce)
    }
}

/// The shared, mutable table of in-flight transfers.
///
/// Inserts come from any number of concurrent scanner tasks; all other
/// mutation is performed by the single attestation-poller task. The API
/// server only ever takes a read lock to build a snapshot.
#[derive(Default)]
pub struct PendingStore {
    inner: RwLock<HashMap<TransferKey, PendingTransfer>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new transfer unless the key already exists, in which case
    /// this is a no-op (re-observation of the same event is idempotent).
    /// Returns `true` if an entry was inserted.
    pub async fn insert_if_absent(&self, transfer: PendingTransfer) -> bool {
        let mut guard = self.inner.write().await;
        let key = transfer.key();
        if guard.contains_key(&key) {
            false
        } else {
            guard.insert(key, transfer);
            true
        }
    }

    /// Returns a snapshot of every pending transfer, cloned out from under
    /// the lock so callers can iterate without holding it.
    pub async fn snapshot(&self) -> Vec<PendingTransfer> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Applies a mutation to the entry at `key`, if it is still present —
    /// another task may have removed it between the caller's snapshot and
    /// this call, which is tolerated silently.
    pub async fn update<F: FnOnce(&mut PendingTransfer)>(&self, key: TransferKey, f: F) {
        let mut guard = self.inner.write().await;
        if let Some(transfer) = guard.get_mut(&key) {
            f(transfer);
        }
    }

    /// Removes the entry at `key`, returning it if present.
    pub async fn remove(&self, key: TransferKey) -> Option<PendingTransfer> {
        self.inner.write().await.remove(&key)
    }

    pub async fn contains(&self, key: TransferKey) -> bool {
        self.inner.read().await.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(burn_nonce: u64) -> PendingTransfer {
        let now = Instant::now();
        PendingTransfer {
            source_domain: 6,
            destination_domain: 0,
            burn_nonce,
            message_hash: B256::repeat_byte(0xAB),
            message_bytes: Bytes::from_static(b"hello"),
            destination_transmitter: Address::repeat_byte(0x11),
            enqueued_at: now,
            retries: 0,
            last_attempt_at: now,
            state: TransferState::Attesting,
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_key() {
        let store = PendingStore::new();
        assert!(store.insert_if_absent(sample(42)).await);
        assert!(!store.insert_if_absent(sample(42)).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_returns_the_entry_once() {
        let store = PendingStore::new();
        store.insert_if_absent(sample(1)).await;
        let removed = store.remove((6, 1)).await;
        assert!(removed.is_some());
        assert!(store.remove((6, 1)).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_on_missing_key_is_silently_ignored() {
        let store = PendingStore::new();
        store.update((6, 999), |t| t.retries += 1).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_reflects_mutations() {
        let store = PendingStore::new();
        store.insert_if_absent(sample(1)).await;
        store.update((6, 1), |t| t.retries = 3).await;
        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].retries, 3);
    }
}
