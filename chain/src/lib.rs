//! Chain library crate.
//!
//! Building blocks for a permissioned, judgement-based blockchain over a
//! vaccination-record ledger:
//!
//! - strongly-typed domain types (`types`) and the crypto adapter backing
//!   them (`crypto`),
//! - the registration-cache engine (`registration`),
//! - the consensus and chain-management engine (`consensus`): the block
//!   tree, creator-election rotation, and node controller,
//! - the peer network adapter (`peer`),
//! - storage backends (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and top-level node configuration (`config`).
//!
//! Higher-level binaries (`main.rs`, and the `node-gateway` crate) compose
//! these pieces into a running node.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod metrics;
pub mod peer;
pub mod registration;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ChainConfig, MetricsConfig};

// Re-export the consensus and chain-management types.
pub use consensus::{AddBlockOutcome, Chain, ConsensusConfig, ConsensusError, NodeController, ValidationError};

// Re-export storage backends.
pub use storage::{BlockPersistence, FileBlockPersistence, InMemoryBlockPersistence};

// Re-export the peer network adapter.
pub use peer::{HttpPeerNetwork, PeerAddr, PeerNetwork, RecordingPeerNetwork};

// Re-export the registration-cache engine.
pub use registration::RegistrationCache;

// Re-export the crypto adapter.
pub use crypto::KeyPair;

// Re-export metrics registry and chain metrics.
pub use metrics::{run_prometheus_http_server, ChainMetrics, MetricsRegistry};

// Re-export domain types at the crate root for convenience.
pub use types::*;
