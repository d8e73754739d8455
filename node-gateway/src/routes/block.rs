//! `POST /new_block`.

use axum::{Json, extract::State, http::StatusCode};
use chain::{AddBlockOutcome, Block};
use serde::{Deserialize, Serialize};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct NewBlockRequest {
    block: Block,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub(crate) status: &'static str,
}

impl AckResponse {
    pub fn new(status: &'static str) -> Self {
        AckResponse { status }
    }
}

fn ack(status: &'static str) -> (StatusCode, Json<AckResponse>) {
    (StatusCode::ACCEPTED, Json(AckResponse::new(status)))
}

/// Per `spec.md` §4.7: the response is an opaque ack regardless of whether
/// the block ended up live, dangling, or denied; the caller finds out the
/// real outcome later via judgement propagation, the same as every other
/// peer in the network does.
pub async fn new_block(
    State(state): State<SharedState>,
    Json(body): Json<NewBlockRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match state.controller.received_new_block(body.block).await {
        Ok(AddBlockOutcome::Inserted { .. }) => ack("inserted"),
        Ok(AddBlockOutcome::Duplicate) => ack("duplicate"),
        Ok(AddBlockOutcome::Dangling) => ack("dangling"),
        Ok(AddBlockOutcome::WrongCreator) => ack("denied"),
        Ok(AddBlockOutcome::Rejected(_)) => ack("denied"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to process incoming block");
            ack("error")
        }
    }
}
