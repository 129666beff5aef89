//! Shared helpers for building synthetic chain events used by the
//! end-to-end pipeline scenario tests in `../pipeline_scenarios.rs`.

use alloy_primitives::{Address, Bytes, LogData, B256, U256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use cctp_relayer::chain::Receipt;
use cctp_relayer::config::ChainConfig;
use cctp_relayer::contracts::{Initiation, MessageSent};
use std::time::Duration;

/// A `ChainConfig` with sensible test defaults; `bridge_address = None` means
/// the chain is destination-only and never scanned.
pub fn chain_config(
    domain_id: u32,
    bridge_address: Option<Address>,
    message_transmitter_address: Address,
    poll_interval: Duration,
) -> ChainConfig {
    ChainConfig {
        chain_id: domain_id as u64 + 1,
        display_name: format!("chain-{domain_id}"),
        domain_id,
        rpc_url: "http://localhost:8545".parse().unwrap(),
        bridge_address,
        message_transmitter_address,
        event_filtering_supported: true,
        confirmations: 0,
        poll_interval,
        max_lookback: 1_000,
    }
}

fn word_u64(v: u64) -> B256 {
    let mut w = [0u8; 32];
    w[24..].copy_from_slice(&v.to_be_bytes());
    B256::from(w)
}

fn word_u32(v: u32) -> B256 {
    let mut w = [0u8; 32];
    w[28..].copy_from_slice(&v.to_be_bytes());
    B256::from(w)
}

/// Builds an `Initiation` log exactly as `get_logs`/`get_receipt` would hand
/// it to the scanner: three indexed topics plus the five non-indexed,
/// fixed-size words (no dynamic ABI encoding needed — none of the non-indexed
/// fields are dynamically sized).
#[allow(clippy::too_many_arguments)]
pub fn initiation_log(
    bridge: Address,
    tx_hash: B256,
    block_number: u64,
    log_index: u64,
    burn_nonce: u64,
    destination_domain: u32,
    amount: U256,
    recipient_commitment: B256,
    nullifier: B256,
) -> Log {
    let mut data = Vec::with_capacity(32 * 5);
    data.extend_from_slice(recipient_commitment.as_slice());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data.extend_from_slice(nullifier.as_slice());
    data.extend_from_slice(B256::ZERO.as_slice());
    data.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());

    let topics = vec![Initiation::SIGNATURE_HASH, word_u64(burn_nonce), word_u64(0), word_u32(destination_domain)];
    let log_data = LogData::new_unchecked(topics, Bytes::from(data));
    let inner = alloy_primitives::Log { address: bridge, data: log_data };
    Log {
        inner,
        block_hash: None,
        block_number: Some(block_number),
        block_timestamp: None,
        transaction_hash: Some(tx_hash),
        transaction_index: None,
        log_index: Some(log_index),
        removed: false,
    }
}

/// ABI-encodes a single dynamic `bytes` argument the way it appears in the
/// non-indexed data of an event with one `bytes` parameter: a 32-byte offset,
/// a 32-byte length, then the payload padded to a 32-byte boundary.
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

/// Builds a `MessageSent(bytes)` log emitted by `transmitter` carrying
/// `payload` as its opaque message.
pub fn message_sent_log(transmitter: Address, payload: &[u8], block_number: u64, tx_hash: B256, log_index: u64) -> Log {
    let data = Bytes::from(encode_bytes_event_data(payload));
    let log_data = LogData::new_unchecked(vec![MessageSent::SIGNATURE_HASH], data);
    let inner = alloy_primitives::Log { address: transmitter, data: log_data };
    Log {
        inner,
        block_hash: None,
        block_number: Some(block_number),
        block_timestamp: None,
        transaction_hash: Some(tx_hash),
        transaction_index: None,
        log_index: Some(log_index),
        removed: false,
    }
}

/// A mined, successful receipt carrying `logs`.
pub fn receipt(logs: Vec<Log>, block_number: u64) -> Receipt {
    Receipt { logs, block_number, status: true }
}
