//! `POST /new_transaction`.

use axum::{Json, extract::State, http::StatusCode};
use chain::Transaction;
use serde::Deserialize;

use crate::routes::block::AckResponse;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    transaction: Transaction,
}

pub async fn new_transaction(
    State(state): State<SharedState>,
    Json(body): Json<NewTransactionRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match state.controller.received_transaction(body.transaction).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(AckResponse::new("queued"))),
        Err(e) => {
            tracing::debug!(error = %e, "rejected incoming transaction");
            (StatusCode::ACCEPTED, Json(AckResponse::new("rejected")))
        }
    }
}
