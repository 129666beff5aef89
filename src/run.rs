//! Service wiring: turns a loaded [`Config`] into a running set of tasks.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, ApiState};
use crate::attestation::{AttestationClient, HttpAttestationClient};
use crate::chain::{AlloyChainConnector, ChainConnector, ChainRegistry};
use crate::config::Config;
use crate::store::PendingStore;
use crate::util::SigDown;
use crate::{poller, scanner, telemetry};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    telemetry::init(&config.log_level);

    let mut connectors: Vec<Arc<dyn ChainConnector>> = Vec::with_capacity(config.chains.len());
    for chain in &config.chains {
        let connector = AlloyChainConnector::connect(
            chain.domain_id,
            chain.display_name.clone(),
            chain.chain_id,
            chain.rpc_url.clone(),
            &config.relayer_key,
        );
        connectors.push(Arc::new(connector));
    }
    let registry = Arc::new(ChainRegistry::new(config.chains.clone(), connectors));
    let store = Arc::new(PendingStore::new());
    let running = Arc::new(AtomicBool::new(config.auto_start_listener));

    let http_client = reqwest::Client::builder().build()?;
    let attestation_client: Arc<dyn AttestationClient> =
        Arc::new(HttpAttestationClient::new(config.attestation_base_url.clone(), http_client));

    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();

    let mut scanner_handles = Vec::new();
    for chain in &config.chains {
        if !chain.is_scannable_source() {
            continue;
        }
        let chain = chain.clone();
        let domain_id = chain.domain_id;
        let Some(connector) = registry.get(domain_id) else {
            continue;
        };
        let handle = tokio::spawn(scanner::run(
            chain,
            connector,
            registry.clone(),
            store.clone(),
            config.scan_chunk_size,
            running.clone(),
            shutdown.clone(),
        ));
        scanner_handles.push(handle);
    }

    let poller_handle = tokio::spawn(poller::run(
        store.clone(),
        registry.clone(),
        attestation_client,
        config.attestation_poll_interval,
        config.max_poll_retries,
        config.dispatch_timeout,
        config.dispatch_gas_limit,
        running.clone(),
        shutdown.clone(),
    ));

    let api_state = ApiState { store: store.clone(), registry: registry.clone(), running: running.clone() };
    let http_endpoints = Router::new().merge(api::routes().with_state(api_state)).layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any),
    ).layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "status API listening");

    let axum_shutdown = shutdown.clone();
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(async move { axum_shutdown.cancelled().await })
        .await?;

    sig_down.recv().await;
    for handle in scanner_handles {
        let _ = handle.await;
    }
    let _ = poller_handle.await;

    Ok(())
}
