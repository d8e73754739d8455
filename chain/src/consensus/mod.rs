//! Consensus and chain-management engine.
//!
//! - [`config::ConsensusConfig`] — shared protocol parameters.
//! - [`error`] — `ValidationError`/`ConsensusError`.
//! - [`chain::Chain`] — the block tree, dangling queue, judgement
//!   bookkeeping, and structural block validation (C3/C6).
//! - [`election`] — the creator-election rotation and its cancellable
//!   periodic task (C7).
//! - [`controller::NodeController`] — ties the tree, election, peer
//!   network, and persistence together (C8).

pub mod chain;
pub mod config;
pub mod controller;
pub mod election;
pub mod error;

pub use chain::{AddBlockOutcome, Chain};
pub use config::ConsensusConfig;
pub use controller::NodeController;
pub use error::{ConsensusError, ValidationError};
