//! Peer network adapter (C9): sends blocks, transactions, judgements, and
//! sync requests to the rest of the network.
//!
//! Grounded on `ml_client/http.rs`'s DTO + hex-helper + `reqwest` shape,
//! swapped from the blocking client to the async one (the whole node is
//! `tokio`-async end to end) and pointed at the five wire routes of
//! `spec.md` §6 instead of a single `/verify` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::consensus::error::ConsensusError;
use crate::types::{Block, Judgement, Transaction};

/// A reachable peer, identified by its HTTP base URL (e.g.
/// `"http://10.0.0.4:8081"`, without a trailing slash).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PeerAddr(pub String);

/// Adapter over the network of peer nodes. `async_trait` is used because
/// every implementation needs `async fn` in a trait object
/// (`Arc<dyn PeerNetwork>`), following the same pattern
/// `examples/karim-agha-rensa` uses it for.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    async fn send_block(&self, peer: &PeerAddr, block: &Block) -> Result<(), ConsensusError>;
    async fn send_transaction(&self, peer: &PeerAddr, tx: &Transaction) -> Result<(), ConsensusError>;
    async fn send_judgement(&self, peer: &PeerAddr, hash_hex: &str, judgement: &Judgement) -> Result<(), ConsensusError>;
    /// Asks `peer` to catch us up from `branch_point` onward (`spec.md` §6:
    /// "body: a block representation"), telling it to push the backlog to
    /// `reply_to`. The reply itself is an opaque ack: the actual backlog
    /// arrives as ordinary `send_block`/`send_judgement` deliveries to
    /// `reply_to` afterward, not in the response body.
    async fn request_sync(&self, peer: &PeerAddr, branch_point: &Block, reply_to: &str) -> Result<(), ConsensusError>;
    /// All peers this node currently knows about.
    fn known_peers(&self) -> Vec<PeerAddr>;
}

/// Broadcasts `block` to every known peer, logging and continuing past
/// individual `PeerUnreachable` failures (`spec.md` §7: "Log, no retry").
pub async fn broadcast_block(network: &dyn PeerNetwork, block: &Block) {
    for peer in network.known_peers() {
        if let Err(e) = network.send_block(&peer, block).await {
            tracing::warn!(peer = %peer.0, error = %e, "peer send failed");
        }
    }
}

/// Broadcasts `tx` to every known peer, same failure policy as
/// [`broadcast_block`].
pub async fn broadcast_transaction(network: &dyn PeerNetwork, tx: &Transaction) {
    for peer in network.known_peers() {
        if let Err(e) = network.send_transaction(&peer, tx).await {
            tracing::warn!(peer = %peer.0, error = %e, "peer send failed");
        }
    }
}

/// Broadcasts `judgement` to every known peer, same failure policy as
/// [`broadcast_block`].
pub async fn broadcast_judgement(network: &dyn PeerNetwork, hash_hex: &str, judgement: &Judgement) {
    for peer in network.known_peers() {
        if let Err(e) = network.send_judgement(&peer, hash_hex, judgement).await {
            tracing::warn!(peer = %peer.0, error = %e, "peer send failed");
        }
    }
}

#[derive(Debug, Serialize)]
struct BlockMessage<'a> {
    block: &'a Block,
}

#[derive(Debug, Serialize)]
struct TransactionMessage<'a> {
    transaction: &'a Transaction,
}

#[derive(Debug, Serialize)]
struct JudgementMessage<'a> {
    hash_of_judged_block: &'a str,
    judgement: &'a Judgement,
}

#[derive(Debug, Serialize)]
struct SyncRequestMessage<'a> {
    branch_point: &'a Block,
    /// Base URL the responder should push the backlog to, since the
    /// response body is an opaque ack.
    reply_to: &'a str,
}

/// HTTP implementation of [`PeerNetwork`], POSTing JSON to the wire routes.
pub struct HttpPeerNetwork {
    client: reqwest::Client,
    peers: Vec<PeerAddr>,
}

impl HttpPeerNetwork {
    pub fn new(peers: Vec<PeerAddr>, timeout: Duration) -> Result<Self, ConsensusError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConsensusError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpPeerNetwork { client, peers })
    }

    fn endpoint(peer: &PeerAddr, path: &str) -> String {
        format!("{}/{}", peer.0.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[async_trait]
impl PeerNetwork for HttpPeerNetwork {
    async fn send_block(&self, peer: &PeerAddr, block: &Block) -> Result<(), ConsensusError> {
        let url = Self::endpoint(peer, "/new_block");
        self.client
            .post(&url)
            .json(&BlockMessage { block })
            .send()
            .await
            .map_err(|e| ConsensusError::PeerUnreachable(format!("POST {url}: {e}")))?;
        Ok(())
    }

    async fn send_transaction(&self, peer: &PeerAddr, tx: &Transaction) -> Result<(), ConsensusError> {
        let url = Self::endpoint(peer, "/new_transaction");
        self.client
            .post(&url)
            .json(&TransactionMessage { transaction: tx })
            .send()
            .await
            .map_err(|e| ConsensusError::PeerUnreachable(format!("POST {url}: {e}")))?;
        Ok(())
    }

    async fn send_judgement(&self, peer: &PeerAddr, hash_hex: &str, judgement: &Judgement) -> Result<(), ConsensusError> {
        let url = Self::endpoint(peer, "/new_judgement");
        self.client
            .post(&url)
            .json(&JudgementMessage {
                hash_of_judged_block: hash_hex,
                judgement,
            })
            .send()
            .await
            .map_err(|e| ConsensusError::PeerUnreachable(format!("POST {url}: {e}")))?;
        Ok(())
    }

    async fn request_sync(&self, peer: &PeerAddr, branch_point: &Block, reply_to: &str) -> Result<(), ConsensusError> {
        let url = Self::endpoint(peer, "/sync_request");
        self.client
            .post(&url)
            .json(&SyncRequestMessage { branch_point, reply_to })
            .send()
            .await
            .map_err(|e| ConsensusError::PeerUnreachable(format!("POST {url}: {e}")))?;
        Ok(())
    }

    fn known_peers(&self) -> Vec<PeerAddr> {
        self.peers.clone()
    }
}

/// Test double that records every call instead of making network requests.
#[derive(Default)]
pub struct RecordingPeerNetwork {
    pub sent_blocks: std::sync::Mutex<Vec<Block>>,
    pub sent_transactions: std::sync::Mutex<Vec<Transaction>>,
    pub sent_judgements: std::sync::Mutex<Vec<(String, Judgement)>>,
    peers: Vec<PeerAddr>,
}

impl RecordingPeerNetwork {
    pub fn new(peers: Vec<PeerAddr>) -> Self {
        RecordingPeerNetwork {
            peers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerNetwork for RecordingPeerNetwork {
    async fn send_block(&self, _peer: &PeerAddr, block: &Block) -> Result<(), ConsensusError> {
        self.sent_blocks.lock().unwrap().push(block.clone());
        Ok(())
    }

    async fn send_transaction(&self, _peer: &PeerAddr, tx: &Transaction) -> Result<(), ConsensusError> {
        self.sent_transactions.lock().unwrap().push(tx.clone());
        Ok(())
    }

    async fn send_judgement(&self, _peer: &PeerAddr, hash_hex: &str, judgement: &Judgement) -> Result<(), ConsensusError> {
        self.sent_judgements
            .lock()
            .unwrap()
            .push((hash_hex.to_string(), judgement.clone()));
        Ok(())
    }

    async fn request_sync(&self, _peer: &PeerAddr, _branch_point: &Block, _reply_to: &str) -> Result<(), ConsensusError> {
        Ok(())
    }

    fn known_peers(&self) -> Vec<PeerAddr> {
        self.peers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::genesis::{build_genesis_block, GenesisSpec};

    #[tokio::test]
    async fn recording_network_captures_sent_block() {
        let kp = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![kp.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let network = RecordingPeerNetwork::new(vec![PeerAddr("http://127.0.0.1:9".to_string())]);

        let peer = network.known_peers().remove(0);
        network.send_block(&peer, &genesis).await.unwrap();

        assert_eq!(network.sent_blocks.lock().unwrap().len(), 1);
    }
}
