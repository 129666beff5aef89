//! Fake implementations of [`ChainConnector`] and [`AttestationClient`] for
//! tests, modeled on the same "configure responses ahead of time" style used
//! for the blockchain and attestation fakes in the corpus this was learned
//! from.

use alloy_primitives::{Address, Bytes, B256};
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::attestation::{AttestationClient, AttestationResponse};
use crate::chain::{ChainConnector, FeeEstimate, Receipt, TxOutcome};
use crate::error::ChainError;

/// A fake chain connector whose responses are configured ahead of time.
///
/// `get_logs` is driven by a fixed set of pre-decoded logs keyed by address;
/// `get_receipt` and `send_and_wait` are driven by maps keyed by tx hash,
/// falling through to a default success outcome for `send_and_wait` so
/// dispatch-path tests don't need to configure it unless they want a
/// specific failure.
#[derive(Default)]
pub struct FakeChainConnector {
    domain_id: u32,
    head_block: Mutex<u64>,
    logs: Mutex<HashMap<Address, Vec<Log>>>,
    receipts: Mutex<HashMap<B256, Receipt>>,
    fees: Mutex<Option<FeeEstimate>>,
    send_outcomes: Mutex<VecDeque<Result<TxOutcome, ChainError>>>,
    sent_calls: Mutex<Vec<(Address, Bytes)>>,
    get_logs_calls: Mutex<Vec<(u64, u64)>>,
}

impl FakeChainConnector {
    pub fn new(domain_id: u32) -> Self {
        Self { domain_id, head_block: Mutex::new(0), ..Default::default() }
    }

    pub fn set_head_block(&self, block: u64) {
        *self.head_block.lock().unwrap() = block;
    }

    pub fn add_logs(&self, address: Address, logs: Vec<Log>) {
        self.logs.lock().unwrap().entry(address).or_default().extend(logs);
    }

    pub fn add_receipt(&self, tx_hash: B256, receipt: Receipt) {
        self.receipts.lock().unwrap().insert(tx_hash, receipt);
    }

    pub fn set_fees(&self, fees: FeeEstimate) {
        *self.fees.lock().unwrap() = Some(fees);
    }

    /// Queues an outcome to return from the next `send_and_wait` call.
    pub fn push_send_outcome(&self, outcome: Result<TxOutcome, ChainError>) {
        self.send_outcomes.lock().unwrap().push_back(outcome);
    }

    /// The `(to, calldata)` pairs passed to `send_and_wait`, in call order.
    pub fn sent_calls(&self) -> Vec<(Address, Bytes)> {
        self.sent_calls.lock().unwrap().clone()
    }

    /// The `(from_block, to_block)` ranges passed to `get_logs`, in call
    /// order. Lets tests confirm a scan window was (or was not) re-requested
    /// without reaching into the scanner's private cursor.
    pub fn get_logs_calls(&self) -> Vec<(u64, u64)> {
        self.get_logs_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainConnector for FakeChainConnector {
    fn domain_id(&self) -> u32 {
        self.domain_id
    }

    async fn head_block(&self) -> Result<u64, ChainError> {
        Ok(*self.head_block.lock().unwrap())
    }

    async fn get_logs(
        &self,
        address: Address,
        _topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ChainError> {
        self.get_logs_calls.lock().unwrap().push((from_block, to_block));
        if to_block < from_block {
            return Ok(Vec::new());
        }
        let logs = self.logs.lock().unwrap().get(&address).cloned().unwrap_or_default();
        Ok(logs
            .into_iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or(0);
                block >= from_block && block <= to_block
            })
            .collect())
    }

    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, ChainError> {
        Ok(self.receipts.lock().unwrap().get(&tx_hash).cloned())
    }

    async fn suggest_fees(&self) -> Result<FeeEstimate, ChainError> {
        Ok(self.fees.lock().unwrap().unwrap_or(FeeEstimate { max_fee_per_gas: 10, max_priority_fee_per_gas: 0 }))
    }

    async fn send_and_wait(
        &self,
        to: Address,
        calldata: Bytes,
        _gas_limit: u64,
        _fees: FeeEstimate,
        _confirmations: u64,
        _timeout: Duration,
    ) -> Result<TxOutcome, ChainError> {
        self.sent_calls.lock().unwrap().push((to, calldata));
        self.send_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TxOutcome { tx_hash: B256::repeat_byte(0x01), status: true, revert_reason: None }))
    }
}

/// A fake attestation client driven by a per-message-hash response queue.
#[derive(Default)]
pub struct FakeAttestationClient {
    responses: Mutex<HashMap<B256, VecDeque<Option<AttestationResponse>>>>,
    call_counts: Mutex<HashMap<B256, usize>>,
}

impl FakeAttestationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a sequence of responses for `message_hash`; once exhausted,
    /// the last response repeats.
    pub fn queue_responses(&self, message_hash: B256, responses: Vec<Option<AttestationResponse>>) {
        self.responses.lock().unwrap().insert(message_hash, responses.into());
    }

    pub fn call_count(&self, message_hash: B256) -> usize {
        *self.call_counts.lock().unwrap().get(&message_hash).unwrap_or(&0)
    }
}

#[async_trait]
impl AttestationClient for FakeAttestationClient {
    async fn get_attestation(&self, message_hash: B256) -> Option<AttestationResponse> {
        *self.call_counts.lock().unwrap().entry(message_hash).or_insert(0) += 1;
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&message_hash) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(None),
            None => None,
        }
    }
}
