//! `POST /sync_request`.

use axum::{Json, extract::State, http::StatusCode};
use chain::Block;
use serde::Deserialize;

use crate::routes::block::AckResponse;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SyncRequestBody {
    branch_point: Block,
    reply_to: String,
}

/// Acknowledges immediately and pushes the backlog asynchronously, per
/// `spec.md` §6's "response: opaque ack (actual payload returned via
/// asynchronous `/new_block` + `/new_judgement` deliveries)".
pub async fn sync_request(
    State(state): State<SharedState>,
    Json(body): Json<SyncRequestBody>,
) -> (StatusCode, Json<AckResponse>) {
    let Some(branch_hash) = body.branch_point.hash else {
        return (StatusCode::BAD_REQUEST, Json(AckResponse::new("malformed branch point")));
    };

    let controller = state.controller.clone();
    tokio::spawn(async move {
        controller.handle_sync_request(branch_hash, &body.reply_to).await;
    });

    (StatusCode::ACCEPTED, Json(AckResponse::new("syncing")))
}
