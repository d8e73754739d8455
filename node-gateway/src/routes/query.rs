//! `GET /latest_block`, `GET /block_by_index/{i}`, `GET /block_by_hash/{h}`.

use axum::{Json, extract::{Path, State}, http::StatusCode};
use chain::{Block, BlockHash};

use crate::state::SharedState;

pub async fn latest_block(State(state): State<SharedState>) -> Json<Block> {
    Json(state.controller.latest_block().await)
}

pub async fn block_by_index(
    State(state): State<SharedState>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, StatusCode> {
    state.controller.block_by_index(index).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn block_by_hash(
    State(state): State<SharedState>,
    Path(hash_hex): Path<String>,
) -> Result<Json<Block>, StatusCode> {
    let hash = BlockHash::from_hex(&hash_hex).ok_or(StatusCode::BAD_REQUEST)?;
    state.controller.block_by_hash(&hash).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use chain::KeyPair;

    use super::*;
    use crate::state::test_support::app_state;

    #[tokio::test]
    async fn latest_block_returns_the_genesis_on_a_fresh_node() {
        let admission = KeyPair::generate();
        let (state, genesis_hash) = app_state(admission);

        let Json(block) = latest_block(State(state)).await;
        assert_eq!(block.hash, Some(genesis_hash));
    }

    #[tokio::test]
    async fn block_by_index_and_by_hash_agree_on_the_genesis() {
        let admission = KeyPair::generate();
        let (state, genesis_hash) = app_state(admission);

        let by_index = block_by_index(State(state.clone()), Path(0)).await.unwrap();
        assert_eq!(by_index.hash, Some(genesis_hash));

        let by_hash = block_by_hash(State(state), Path(genesis_hash.to_hex())).await.unwrap();
        assert_eq!(by_hash.hash, Some(genesis_hash));
    }

    #[tokio::test]
    async fn an_unknown_index_returns_not_found() {
        let admission = KeyPair::generate();
        let (state, _genesis_hash) = app_state(admission);

        match block_by_index(State(state), Path(99)).await {
            Err(status) => assert_eq!(status, StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected NOT_FOUND for an out-of-range index"),
        }
    }

    #[tokio::test]
    async fn a_malformed_hash_returns_bad_request() {
        let admission = KeyPair::generate();
        let (state, _genesis_hash) = app_state(admission);

        match block_by_hash(State(state), Path("not hex".to_string())).await {
            Err(status) => assert_eq!(status, StatusCode::BAD_REQUEST),
            Ok(_) => panic!("expected BAD_REQUEST for a malformed hash"),
        }
    }
}
