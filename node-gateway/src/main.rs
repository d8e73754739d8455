//! Node gateway binary.
//!
//! Exposes `spec.md` §6's wire protocol on top of the `chain` crate:
//!
//! - `POST /new_block`, `/new_transaction`, `/new_judgement`, `/sync_request`
//! - `GET  /latest_block`, `/block_by_index/{i}`, `/block_by_hash/{h}`
//! - `GET  /health`
//!
//! It embeds a [`chain::NodeController`] (file-backed persistence, HTTP
//! peer network), a background election task driving block production,
//! an optional self-registration transaction, an optional interactive
//! CLI, and a Prometheus metrics exporter on its own port.

mod cli;
mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use chain::{
    FileBlockPersistence, HttpPeerNetwork, KeyPair, MetricsRegistry, NodeController,
    PermissionKind, PermissionTx, Transaction, run_prometheus_http_server,
};
use chain::types::genesis::build_genesis_block;
use config::{chain_config_from_env, genesis_spec_from_env, ApiConfig};
use routes::{block, health, judgement, query, sync, transaction};
use state::{AppState, SharedState};

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "node_gateway=info,chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let api_cfg = ApiConfig::from_env();
    let chain_cfg = chain_config_from_env();

    std::fs::create_dir_all(&chain_cfg.key_folder)
        .map_err(|e| format!("failed to create key folder: {e}"))?;
    let key_pair = KeyPair::load_or_generate(&chain_cfg.key_folder)
        .map_err(|e| format!("failed to load or generate keypair: {e}"))?;
    // A second load of the same files, kept by this binary for signing
    // self-submitted transactions; `NodeController` takes ownership of the
    // first one.
    let own_key_pair = Arc::new(
        KeyPair::load_or_generate(&chain_cfg.key_folder)
            .map_err(|e| format!("failed to reload keypair: {e}"))?,
    );

    let genesis_spec = genesis_spec_from_env(&key_pair.public_key(), chain_cfg.consensus.version);
    let genesis = build_genesis_block(&genesis_spec);

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );
    if chain_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    let persistence = FileBlockPersistence::open(&chain_cfg.persistance_folder)
        .map_err(|e| format!("failed to open block persistence at {:?}: {e}", chain_cfg.persistance_folder))?;
    let peers = HttpPeerNetwork::new(chain_cfg.peers.clone(), std::time::Duration::from_secs(5))
        .map_err(|e| format!("failed to build peer network: {e}"))?;

    let controller = Arc::new(NodeController::new(
        key_pair,
        genesis,
        &genesis_spec,
        chain_cfg.consensus.clone(),
        persistence,
        peers,
        metrics.clone(),
    ));
    controller
        .replay_persisted()
        .await
        .map_err(|e| format!("failed to replay persisted blocks: {e}"))?;

    if !chain_cfg.peers.is_empty() {
        let self_addr = format!("http://127.0.0.1:{}", api_cfg.listen_addr.port());
        let sync_controller = controller.clone();
        tokio::spawn(async move {
            sync_controller.request_sync(&self_addr).await;
        });
    }

    if api_cfg.register_as_admission {
        let mut tx = PermissionTx::new(PermissionKind::Admission, own_key_pair.public_key(), now_secs(), chain_cfg.consensus.version);
        tx.sign(&own_key_pair);
        if let Err(e) = controller.received_transaction(Transaction::Permission(tx)).await {
            tracing::warn!(error = %e, "failed to self-submit admission registration");
        }
    }

    let block_time = chain_cfg.consensus.block_time;
    let election_controller = controller.clone();
    let _election_handle = chain::consensus::election::spawn_election_task(block_time, move || {
        let controller = election_controller.clone();
        async move { controller.try_produce_blocks().await }
    });

    if api_cfg.start_cli {
        cli::spawn(controller.clone(), own_key_pair.clone(), chain_cfg.consensus.version);
    }

    let app_state: SharedState = Arc::new(AppState {
        controller,
        api: api_cfg.clone(),
    });

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/new_block", post(block::new_block))
        .route("/new_transaction", post(transaction::new_transaction))
        .route("/new_judgement", post(judgement::new_judgement))
        .route("/sync_request", post(sync::sync_request))
        .route("/latest_block", get(query::latest_block))
        .route("/block_by_index/{i}", get(query::block_by_index))
        .route("/block_by_hash/{h}", get(query::block_by_hash))
        .with_state(app_state);

    tracing::info!("node gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("gateway server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
