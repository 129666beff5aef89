//! Cross-chain message relayer entrypoint.
//!
//! Scans configured source chains for bridge `Initiation` events, correlates
//! each with its outer `MessageSent` message, polls the attestation authority
//! until ready, and relays the attested message to its destination chain.
//! Exposes a read-only status API with start/stop controls.

use std::process;

use cctp_relayer::run;

#[tokio::main]
async fn main() {
    if let Err(e) = run::run().await {
        eprintln!("{e}");
        process::exit(1);
    }
}
