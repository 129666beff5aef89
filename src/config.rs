//! Configuration loading for the relayer.
//!
//! Unlike the JSON-config-file convention used elsewhere in this codebase's
//! lineage, this service is configured entirely from the process environment:
//! a global `RELAYER_PRIVATE_KEY`, a fixed small set of process-level flags,
//! and a `{CHAIN}_*` family of variables per configured chain. `CliArgs`
//! still uses `clap`'s `env` derive for the process-level flags so each one
//! can be set either as a flag or an environment variable, matching how the
//! rest of this lineage exposes its port/host settings.

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use std::env;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// A chain this relayer knows the CCTP domain id and chain id for by default.
/// Any of these fields can be overridden per-deployment via `{KEY}_DOMAIN_ID`
/// / `{KEY}_CHAIN_ID`; the defaults just save an operator from having to look
/// them up for the common chains.
///
/// Domain ids mirror Circle's published CCTP domain assignments
/// (<https://developers.circle.com/stablecoins/evm-smart-contracts>).
struct KnownChain {
    key: &'static str,
    display_name: &'static str,
    default_chain_id: u64,
    default_domain_id: u32,
}

const KNOWN_CHAINS: &[KnownChain] = &[
    KnownChain { key: "ETHEREUM", display_name: "Ethereum", default_chain_id: 1, default_domain_id: 0 },
    KnownChain { key: "AVALANCHE", display_name: "Avalanche", default_chain_id: 43114, default_domain_id: 1 },
    KnownChain { key: "OPTIMISM", display_name: "Optimism", default_chain_id: 10, default_domain_id: 2 },
    KnownChain { key: "ARBITRUM", display_name: "Arbitrum", default_chain_id: 42161, default_domain_id: 3 },
    KnownChain { key: "BASE", display_name: "Base", default_chain_id: 8453, default_domain_id: 6 },
    KnownChain { key: "POLYGON", display_name: "Polygon", default_chain_id: 137, default_domain_id: 7 },
    KnownChain { key: "UNICHAIN", display_name: "Unichain", default_chain_id: 130, default_domain_id: 10 },
];

/// Process-level CLI flags, each resolvable from an environment variable of
/// the same name.
#[derive(Parser, Debug)]
#[command(name = "cctp-relayer")]
#[command(about = "Cross-chain message relayer")]
struct CliArgs {
    /// HTTP port for the status API.
    #[arg(long, env = "CCTP_PORT", default_value_t = 3001)]
    port: u16,
    /// Whether scanning starts automatically on boot.
    #[arg(long, env = "AUTO_START_LISTENER", default_value_t = true)]
    auto_start_listener: bool,
    /// `tracing` env-filter directive, e.g. "info" or "cctp_relayer=debug".
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Per-chain configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub display_name: String,
    pub domain_id: u32,
    pub rpc_url: Url,
    /// The contract emitting `Initiation` events. Absent means this chain is
    /// configured as destination-only.
    pub bridge_address: Option<Address>,
    pub message_transmitter_address: Address,
    pub event_filtering_supported: bool,
    pub confirmations: u64,
    pub poll_interval: Duration,
    pub max_lookback: u64,
}

impl ChainConfig {
    /// True if this chain can be scanned as a source.
    pub fn is_scannable_source(&self) -> bool {
        self.bridge_address.is_some() && self.event_filtering_supported
    }
}

/// Top-level relayer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub auto_start_listener: bool,
    pub log_level: String,
    pub relayer_key: PrivateKeySigner,
    pub chains: Vec<ChainConfig>,
    pub attestation_base_url: Url,
    pub attestation_poll_interval: Duration,
    pub max_poll_retries: u32,
    pub dispatch_timeout: Duration,
    pub dispatch_gas_limit: u64,
    pub scan_chunk_size: u64,
}

impl Config {
    /// Loads configuration from `.env` (if present) and the process
    /// environment. Fails with [`ConfigError`] on any missing or malformed
    /// required value — callers should treat this as fatal.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let cli = CliArgs::parse();

        let private_key_hex =
            env::var("RELAYER_PRIVATE_KEY").map_err(|_| ConfigError::MissingPrivateKey)?;
        let relayer_key = parse_private_key(&private_key_hex)?;

        let chains = load_chains()?;
        if chains.is_empty() {
            return Err(ConfigError::NoChains);
        }
        let mut seen_domains = std::collections::HashSet::new();
        for chain in &chains {
            if !seen_domains.insert(chain.domain_id) {
                return Err(ConfigError::DuplicateDomain(chain.domain_id));
            }
        }

        let attestation_base_url = env_or("ATTESTATION_BASE_URL", "https://iris-api.circle.com")
            .parse::<Url>()
            .map_err(|e| ConfigError::InvalidValue {
                chain: "global".to_string(),
                var: "ATTESTATION_BASE_URL",
                reason: e.to_string(),
            })?;

        Ok(Config {
            port: cli.port,
            auto_start_listener: cli.auto_start_listener,
            log_level: cli.log_level,
            relayer_key,
            chains,
            attestation_base_url,
            attestation_poll_interval: Duration::from_secs(env_num("ATTESTATION_POLL_INTERVAL_SECS", 15)),
            max_poll_retries: env_num("MAX_POLL_RETRIES", 60) as u32,
            dispatch_timeout: Duration::from_secs(env_num("DISPATCH_TIMEOUT_SECS", 180)),
            dispatch_gas_limit: env_num("DISPATCH_GAS_LIMIT", 500_000),
            scan_chunk_size: env_num("SCAN_CHUNK_SIZE", 2_000),
        })
    }
}

fn parse_private_key(hex: &str) -> Result<PrivateKeySigner, ConfigError> {
    let bytes = hex
        .strip_prefix("0x")
        .unwrap_or(hex)
        .parse::<B256>()
        .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
    PrivateKeySigner::from_bytes(&bytes).map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
}

fn load_chains() -> Result<Vec<ChainConfig>, ConfigError> {
    let mut chains = Vec::new();
    for known in KNOWN_CHAINS {
        let rpc_var = format!("{}_RPC_URL", known.key);
        let Ok(rpc_url) = env::var(&rpc_var) else {
            continue;
        };
        let rpc_url = rpc_url.parse::<Url>().map_err(|e| ConfigError::InvalidValue {
            chain: known.key.to_string(),
            var: "RPC_URL",
            reason: e.to_string(),
        })?;

        let bridge_address = env_address_opt(known.key, "BRIDGE_ADDRESS")?;
        let message_transmitter_address = env_address(known.key, "MESSAGE_TRANSMITTER_ADDRESS")?;

        chains.push(ChainConfig {
            chain_id: env_num(&format!("{}_CHAIN_ID", known.key), known.default_chain_id),
            display_name: known.display_name.to_string(),
            domain_id: env_num(&format!("{}_DOMAIN_ID", known.key), known.default_domain_id as u64) as u32,
            rpc_url,
            bridge_address,
            message_transmitter_address,
            event_filtering_supported: env_bool(&format!("{}_EVENT_FILTERING_SUPPORTED", known.key), true),
            confirmations: env_num(&format!("{}_CONFIRMATIONS", known.key), 0),
            poll_interval: Duration::from_secs(env_num(&format!("{}_POLL_INTERVAL_SECS", known.key), 15)),
            max_lookback: env_num(&format!("{}_MAX_LOOKBACK", known.key), 10_000),
        });
    }
    Ok(chains)
}

fn env_address(chain_key: &str, suffix: &str) -> Result<Address, ConfigError> {
    let var = format!("{}_{}", chain_key, suffix);
    let value = env::var(&var).map_err(|_| ConfigError::InvalidValue {
        chain: chain_key.to_string(),
        var: leak(suffix),
        reason: "required but not set".to_string(),
    })?;
    value.parse::<Address>().map_err(|e| ConfigError::InvalidValue {
        chain: chain_key.to_string(),
        var: leak(suffix),
        reason: e.to_string(),
    })
}

fn env_address_opt(chain_key: &str, suffix: &str) -> Result<Option<Address>, ConfigError> {
    let var = format!("{}_{}", chain_key, suffix);
    match env::var(&var) {
        Ok(value) => value
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                chain: chain_key.to_string(),
                var: leak(suffix),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_num(var: &str, default: u64) -> u64 {
    env::var(var).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(var: &str, default: bool) -> bool {
    env::var(var).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// `ConfigError::InvalidValue::var` is `&'static str` for a cheap,
/// allocation-free common case; the per-chain suffixes are themselves
/// `'static` string literals, so this just recovers that.
fn leak(suffix: &str) -> &'static str {
    match suffix {
        "BRIDGE_ADDRESS" => "BRIDGE_ADDRESS",
        "MESSAGE_TRANSMITTER_ADDRESS" => "MESSAGE_TRANSMITTER_ADDRESS",
        _ => "UNKNOWN",
    }
}
