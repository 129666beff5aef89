//! Error taxonomy for the relayer pipeline.
//!
//! Each component raises a narrow, classified error rather than an opaque
//! `anyhow`-style blob. The scanner and poller loops inspect these variants to
//! decide whether to retry, drop, or terminate — see the component docs in
//! `scanner`, `correlator`, `poller`, and `dispatcher`.

/// Known revert/rejection phrasing that indicates a message was already
/// delivered by another relayer, not that delivery failed.
const ALREADY_RELAYED_PATTERNS: &[&str] = &[
    "nonce already used",
    "already received",
    "already processed",
    "message already received",
];

/// Errors surfaced by a [`crate::chain::ChainConnector`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("transient RPC error: {0}")]
    Transient(String),
    #[error("transaction {0:#x} not confirmed within timeout")]
    ConfirmTimeout(alloy_primitives::B256),
    #[error("transport error: {0}")]
    Transport(#[from] alloy_transport::TransportError),
}

/// Errors raised while correlating an [`crate::store::InitiationEvent`] with its
/// outer message.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("no MessageSent log found in the same receipt")]
    CorrelationMissing,
    #[error("unknown destination domain {0}")]
    UnknownDestination(u32),
}

/// Outcome of a single dispatch attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("destination reverted: {0}")]
    Revert(String),
    #[error("confirmation timed out")]
    ConfirmTimeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl DispatchError {
    /// True if the revert/timeout reason indicates another relayer already
    /// delivered this message — a success, not a failure.
    pub fn is_duplicate(&self) -> bool {
        match self {
            DispatchError::Revert(reason) => {
                let lower = reason.to_lowercase();
                ALREADY_RELAYED_PATTERNS.iter().any(|p| lower.contains(p))
            }
            _ => false,
        }
    }
}

/// Fatal configuration errors. Causes the process to exit with code 1.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RELAYER_PRIVATE_KEY is required")]
    MissingPrivateKey,
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("{chain}: invalid value for {var}: {reason}")]
    InvalidValue {
        chain: String,
        var: &'static str,
        reason: String,
    },
    #[error("no chains configured")]
    NoChains,
    #[error("duplicate domain_id {0} across configured chains")]
    DuplicateDomain(u32),
}

/// Top-level relayer error, used where callers need a single error type (the
/// HTTP control endpoints, `main`/`run`).
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("the relayer is already running")]
    AlreadyRunning,
    #[error("the relayer is already stopped")]
    AlreadyStopped,
}
