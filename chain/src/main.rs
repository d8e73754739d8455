//! Standalone local simulation binary.
//!
//! `node-gateway` is the real network-facing entry point (it owns the HTTP
//! routes `spec.md` §6 defines); this binary exists to run the consensus
//! engine against itself with no network at all, useful for exercising the
//! election/judgement/persistence loop in one process the way
//! `original_source/run_single_client.py` lets a developer poke a single
//! client from a shell. It registers the one admission it starts with,
//! produces a handful of blocks, and prints the resulting tree.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chain::{
    ChainConfig, ConsensusConfig, FileBlockPersistence, KeyPair, MetricsRegistry, NodeController,
    RecordingPeerNetwork,
};
use chain::types::genesis::{build_genesis_block, GenesisSpec};
use tracing_subscriber::EnvFilter;

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ChainConfig::default();
    std::fs::create_dir_all(&cfg.key_folder)?;
    let key_pair = KeyPair::load_or_generate(&cfg.key_folder)?;

    let genesis_spec = GenesisSpec {
        admissions: vec![key_pair.public_key()],
        doctors: vec![],
        vaccines: vec!["measles".to_string(), "polio".to_string()],
        timestamp: now_secs(),
        version: ConsensusConfig::default().version,
    };
    let genesis = build_genesis_block(&genesis_spec);

    let persistence = FileBlockPersistence::open(&cfg.persistance_folder)?;
    let peers = RecordingPeerNetwork::new(cfg.peers.clone());
    let metrics = Arc::new(MetricsRegistry::new()?);

    let controller = NodeController::new(
        key_pair,
        genesis,
        &genesis_spec,
        ConsensusConfig::default(),
        persistence,
        peers,
        metrics.clone(),
    );
    controller.replay_persisted().await?;

    tracing::info!("running local simulation with a single admission node");
    for round in 0..3 {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        controller.try_produce_blocks().await?;
        tracing::info!(round, "election tick complete");
    }

    Ok(())
}
