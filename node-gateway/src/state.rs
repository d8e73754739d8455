//! Shared application state.

use std::sync::Arc;

use chain::{FileBlockPersistence, HttpPeerNetwork, NodeController};

use crate::config::ApiConfig;

/// The concrete controller type this binary wires up: file-backed
/// persistence and an HTTP peer network, as opposed to the in-memory test
/// doubles `chain`'s own test suite uses.
pub type Controller = NodeController<FileBlockPersistence, HttpPeerNetwork>;

/// Shared state held by request handlers via Axum's `State` extractor.
pub struct AppState {
    pub controller: Arc<Controller>,
    pub api: ApiConfig,
}

pub type SharedState = Arc<AppState>;
