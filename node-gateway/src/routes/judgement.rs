//! `POST /new_judgement`.

use axum::{Json, extract::State, http::StatusCode};
use chain::{BlockHash, Judgement};
use serde::Deserialize;

use crate::routes::block::AckResponse;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct NewJudgementRequest {
    hash_of_judged_block: String,
    judgement: Judgement,
}

pub async fn new_judgement(
    State(state): State<SharedState>,
    Json(body): Json<NewJudgementRequest>,
) -> (StatusCode, Json<AckResponse>) {
    let Some(hash) = BlockHash::from_hex(&body.hash_of_judged_block) else {
        return (StatusCode::BAD_REQUEST, Json(AckResponse::new("malformed hash")));
    };

    match state.controller.received_judgement(hash, body.judgement).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(AckResponse::new("recorded"))),
        Err(e) => {
            tracing::debug!(error = %e, "rejected incoming judgement");
            (StatusCode::ACCEPTED, Json(AckResponse::new("rejected")))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use chain::{Block, Judgement, KeyPair};

    use super::*;
    use crate::state::test_support::app_state;

    #[tokio::test]
    async fn a_malformed_hash_is_rejected_before_reaching_the_controller() {
        let admission = KeyPair::generate();
        let (state, genesis_hash) = app_state(admission.clone());

        let mut judgement = Judgement::new(genesis_hash, true, admission.public_key(), 1_700_000_001, 1);
        judgement.sign(&admission);

        let (status, Json(ack)) = new_judgement(
            State(state),
            Json(NewJudgementRequest {
                hash_of_judged_block: "not hex".to_string(),
                judgement,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ack.status, "malformed hash");
    }

    #[tokio::test]
    async fn a_valid_judgement_against_a_live_block_is_recorded() {
        let admission = KeyPair::generate();
        let (state, _genesis_hash) = app_state(admission.clone());
        let genesis = state.controller.latest_block().await;

        let mut block = Block::new(&genesis, admission.public_key(), genesis.timestamp + 5, 1);
        block.sign(&admission).unwrap();
        block.update_hash();
        let block_hash = block.hash.unwrap();
        state.controller.received_new_block(block).await.unwrap();

        let mut judgement = Judgement::new(block_hash, true, admission.public_key(), 1_700_000_006, 1);
        judgement.sign(&admission);

        let (status, Json(ack)) = new_judgement(
            State(state),
            Json(NewJudgementRequest {
                hash_of_judged_block: block_hash.to_hex(),
                judgement,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(ack.status, "recorded");
    }
}
