//! Core library for the CCTP-style cross-chain relayer.
//!
//! The binary entrypoint (`main.rs`/`run.rs`) wires these modules into a running
//! service; this crate root exists so that integration tests and the `testing`
//! fakes can depend on the pipeline without going through `main`.

pub mod api;
pub mod attestation;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod run;
pub mod scanner;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod util;

pub use error::RelayerError;
