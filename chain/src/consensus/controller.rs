//! Node controller (C8): ties the block tree, creator-election rotation,
//! peer network, and persistence together into the behavior a running node
//! actually exhibits.
//!
//! Dispatch order for a freshly-received block follows
//! `original_source/blockchain/full_client.py`'s `received_new_block`:
//! a duplicate hash is dropped before any expensive work; otherwise the
//! block is rebroadcast to peers *before* structural validation runs
//! (propagate first, judge second, the same order the original client
//! uses so a slow validator doesn't also become a slow relay); an unknown
//! parent queues the block dangling; a creator mismatch or a structural
//! failure produces a deny-judgement instead of a silent drop; a clean
//! insert persists the block, emits this node's own accept-judgement,
//! drops any now-redundant pending transactions, and retries whatever was
//! waiting on this block as a parent. `eval()`-based message parsing in
//! the original is not carried over anywhere in this path: every inbound
//! payload arrives already parsed into [`Block`]/[`Transaction`]/
//! [`Judgement`] by the wire layer's `serde_json` decoding.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use crate::consensus::chain::{AddBlockOutcome, Chain};
use crate::consensus::config::ConsensusConfig;
use crate::consensus::election;
use crate::consensus::error::{ConsensusError, ValidationError};
use crate::crypto::KeyPair;
use crate::metrics::MetricsRegistry;
use crate::peer::{broadcast_block, broadcast_judgement, broadcast_transaction, PeerNetwork};
use crate::storage::BlockPersistence;
use crate::types::genesis::GenesisSpec;
use crate::types::{Block, BlockHash, Judgement, Transaction};

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Ties together the block tree, this node's keypair, its peer network, and
/// its persistence adapter. Generic over both the same way the teacher's
/// `ConsensusEngine<S, V, F>` was generic over its store/validator/fork
/// choice, so a test can swap in [`crate::peer::RecordingPeerNetwork`] and
/// [`crate::storage::InMemoryBlockPersistence`] without a trait object.
pub struct NodeController<P, N>
where
    P: BlockPersistence,
    N: PeerNetwork,
{
    key_pair: KeyPair,
    cfg: ConsensusConfig,
    chain: Mutex<Chain>,
    persistence: P,
    peers: N,
    metrics: Arc<MetricsRegistry>,
    pending: Mutex<VecDeque<Transaction>>,
}

impl<P, N> NodeController<P, N>
where
    P: BlockPersistence,
    N: PeerNetwork,
{
    /// Builds a controller rooted at `genesis`. Callers that have persisted
    /// blocks from a previous run should follow this with
    /// [`NodeController::replay_persisted`].
    pub fn new(
        key_pair: KeyPair,
        genesis: Block,
        genesis_spec: &GenesisSpec,
        cfg: ConsensusConfig,
        persistence: P,
        peers: N,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        NodeController {
            key_pair,
            cfg,
            chain: Mutex::new(Chain::new(genesis, genesis_spec)),
            persistence,
            peers,
            metrics,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Reloads every block `persistence` holds and re-inserts it into the
    /// tree, retrying in passes since a directory scan returns blocks in no
    /// particular order (`spec.md` §6). Stops once a full pass makes no
    /// further progress, leaving any block whose parent never turned up
    /// simply absent from the tree, the same as it would be if it had never
    /// been persisted.
    pub async fn replay_persisted(&self) -> Result<(), ConsensusError> {
        let mut remaining = self
            .persistence
            .load_all()
            .map_err(|e| ConsensusError::PersistenceFailure(e.to_string()))?;

        loop {
            let before = remaining.len();
            let mut still_pending = Vec::new();
            for block in remaining {
                let Some(hash) = block.hash else { continue };
                let already_known = { self.chain.lock().await.find_block_by_hash(&hash).is_some() };
                if already_known {
                    continue;
                }
                let outcome = {
                    let mut chain = self.chain.lock().await;
                    chain.add_block(block.clone(), &self.cfg, now_secs())
                };
                if !matches!(outcome, AddBlockOutcome::Inserted { .. }) {
                    still_pending.push(block);
                }
            }
            if still_pending.is_empty() || still_pending.len() == before {
                break;
            }
            remaining = still_pending;
        }
        Ok(())
    }

    /// Handles a block received from a peer (or loaded fresh off the wire).
    pub async fn received_new_block(&self, block: Block) -> Result<AddBlockOutcome, ConsensusError> {
        let hash = block
            .hash
            .ok_or_else(|| ConsensusError::MalformedMessage("block has no hash".to_string()))?;

        let duplicate = { self.chain.lock().await.find_block_by_hash(&hash).is_some() };
        if duplicate {
            return Ok(AddBlockOutcome::Duplicate);
        }

        broadcast_block(&self.peers, &block).await;

        let outcome = self.insert_one(block, hash).await?;
        if matches!(outcome, AddBlockOutcome::Inserted { .. }) {
            self.drain_dangling(hash).await;
        }
        Ok(outcome)
    }

    /// Handles a judgement received from a peer.
    pub async fn received_judgement(&self, hash: BlockHash, judgement: Judgement) -> Result<(), ConsensusError> {
        self.metrics.chain.judgements_tallied.inc();
        let relocated = {
            let mut chain = self.chain.lock().await;
            chain.update_judgements(&hash, judgement.clone())?
        };
        if !relocated.is_empty() {
            self.metrics.chain.branches_relocated.inc_by(relocated.len() as u64);
            tracing::warn!(count = relocated.len(), hash = %hash.to_hex(), "branch relocated by deny quorum");
        }
        broadcast_judgement(&self.peers, &hash.to_hex(), &judgement).await;
        Ok(())
    }

    /// Handles a transaction received from a peer or a local client,
    /// queueing it for the next block this node produces.
    pub async fn received_transaction(&self, tx: Transaction) -> Result<(), ConsensusError> {
        if self.pending.lock().await.iter().any(|p| p == &tx) {
            return Err(ConsensusError::DuplicateReceive);
        }

        let validation = {
            let chain = self.chain.lock().await;
            let leaf = self.canonical_leaf(&chain);
            let cache = chain
                .registration_cache(&leaf)
                .expect("canonical leaf is always present in the tree");
            tx.validate(&cache.admissions, &cache.doctors, &cache.vaccines)
        };
        validation.map_err(|reason| ConsensusError::StructuralInvalid(ValidationError::Custom(reason)))?;

        self.pending.lock().await.push_back(tx.clone());
        broadcast_transaction(&self.peers, &tx).await;
        Ok(())
    }

    /// Called by the election task on every tick: for each current leaf,
    /// builds and broadcasts a block if this node is the expected creator.
    pub async fn try_produce_blocks(&self) -> Result<(), ConsensusError> {
        let now = now_secs();
        let leaves = { self.chain.lock().await.get_leaves() };
        for leaf in leaves {
            self.try_produce_block_on(leaf, now).await?;
        }
        Ok(())
    }

    async fn try_produce_block_on(&self, parent_hash: BlockHash, now: u64) -> Result<(), ConsensusError> {
        let (parent, history) = {
            let chain = self.chain.lock().await;
            let Some(parent) = chain.find_block_by_hash(&parent_hash).cloned() else {
                return Ok(());
            };
            let roster_size = chain
                .registration_cache(&parent_hash)
                .map(|c| c.admissions.len())
                .unwrap_or(0);
            let history = chain.get_block_creation_history_by_hash(roster_size, &parent_hash);
            (parent, history)
        };
        let Some(history) = history else { return Ok(()) };
        let expected = election::expected_creator(&history, parent.timestamp, now, self.cfg.block_time);
        if expected.as_ref() != Some(&self.key_pair.public_key()) {
            return Ok(());
        }

        let mut block = Block::new(&parent, self.key_pair.public_key(), now, self.cfg.version);
        let pending_txs: Vec<Transaction> = { self.pending.lock().await.iter().cloned().collect() };
        for tx in pending_txs {
            if block.add_transaction(tx, self.cfg.block_size).is_err() {
                break;
            }
        }
        block
            .sign(&self.key_pair)
            .map_err(|e| ConsensusError::Other(e.to_string()))?;
        block.update_hash();
        let hash = block.hash.expect("just hashed");

        broadcast_block(&self.peers, &block).await;
        let outcome = self.insert_one(block, hash).await?;
        if matches!(outcome, AddBlockOutcome::Inserted { .. }) {
            self.drain_dangling(hash).await;
        }
        Ok(())
    }

    /// Inserts `block` into the tree and reacts to the outcome: persist and
    /// self-accept on success, deny-judgement on a rejection, nothing on
    /// dangling (the caller already rebroadcast it; it simply waits).
    async fn insert_one(&self, block: Block, hash: BlockHash) -> Result<AddBlockOutcome, ConsensusError> {
        let start = std::time::Instant::now();
        let now = now_secs();
        let outcome = {
            let mut chain = self.chain.lock().await;
            chain.add_block(block.clone(), &self.cfg, now)
        };
        self.metrics.chain.block_validation_seconds.observe(start.elapsed().as_secs_f64());

        match &outcome {
            AddBlockOutcome::Dangling => {
                self.metrics.chain.dangling_queue_depth.inc();
            }
            AddBlockOutcome::Duplicate => {}
            AddBlockOutcome::WrongCreator | AddBlockOutcome::Rejected(_) => {
                self.metrics.chain.blocks_rejected.inc();
                self.emit_judgement(hash, false).await?;
            }
            AddBlockOutcome::Inserted { .. } => {
                self.metrics.chain.blocks_imported.inc();
                if let Err(e) = self.persistence.store_block(&block) {
                    tracing::warn!(error = %e, hash = %hash.to_hex(), "failed to persist accepted block, staying in memory");
                }
                self.remove_from_pending(&block).await;
                self.emit_judgement(hash, true).await?;
                self.resolve_sibling_tiebreak(block.previous_block).await?;
            }
        }
        Ok(outcome)
    }

    /// Retries every block that was queued waiting on `parent_hash`,
    /// cascading through however many generations were dangling on it.
    async fn drain_dangling(&self, parent_hash: BlockHash) {
        let mut queue = VecDeque::new();
        queue.push_back(parent_hash);
        while let Some(hash) = queue.pop_front() {
            let children = { self.chain.lock().await.take_dangling_children(&hash) };
            for child in children {
                let Some(child_hash) = child.hash else { continue };
                match self.insert_one(child, child_hash).await {
                    Ok(AddBlockOutcome::Inserted { .. }) => queue.push_back(child_hash),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to re-insert a dangling block"),
                }
            }
        }
    }

    /// Signs and records this node's own vote on `hash`, broadcasting it
    /// onward. A silent no-op if this node's key isn't an admission at the
    /// judged block's parent (a non-admission node still tracks the tree,
    /// it just doesn't get a vote). Losing a tie-break against a sibling
    /// flows through here identically to any externally-received
    /// judgement: there is no separate self-judgement code path.
    async fn emit_judgement(&self, hash: BlockHash, accept: bool) -> Result<(), ConsensusError> {
        let is_admission = {
            let chain = self.chain.lock().await;
            let Some(block) = chain.find_block_by_hash(&hash) else {
                return Ok(());
            };
            let Some(parent_hash) = block.previous_block else {
                return Ok(());
            };
            chain
                .registration_cache(&parent_hash)
                .map(|cache| cache.admissions.contains(&self.key_pair.public_key()))
                .unwrap_or(false)
        };
        if !is_admission {
            return Ok(());
        }

        let mut judgement = Judgement::new(hash, accept, self.key_pair.public_key(), now_secs(), self.cfg.version);
        judgement.sign(&self.key_pair);
        self.metrics.chain.judgements_tallied.inc();

        let relocated = {
            let mut chain = self.chain.lock().await;
            chain.update_judgements(&hash, judgement.clone())?
        };
        if !relocated.is_empty() {
            self.metrics.chain.branches_relocated.inc_by(relocated.len() as u64);
            tracing::warn!(count = relocated.len(), hash = %hash.to_hex(), "branch relocated by deny quorum");
        }
        broadcast_judgement(&self.peers, &hash.to_hex(), &judgement).await;
        Ok(())
    }

    /// When a block's insertion leaves its parent with more than one live
    /// child, denies every sibling but the one with the lexicographically
    /// smallest creator public key.
    async fn resolve_sibling_tiebreak(&self, parent_hash: Option<BlockHash>) -> Result<(), ConsensusError> {
        let Some(parent_hash) = parent_hash else { return Ok(()) };
        let siblings = { self.chain.lock().await.live_children(&parent_hash) };
        if siblings.len() <= 1 {
            return Ok(());
        }
        let winner = siblings.iter().min_by_key(|(_, creator)| creator.clone()).map(|(h, _)| *h);
        for (hash, _) in &siblings {
            if Some(*hash) != winner {
                self.emit_judgement(*hash, false).await?;
            }
        }
        Ok(())
    }

    async fn remove_from_pending(&self, block: &Block) {
        let mut pending = self.pending.lock().await;
        pending.retain(|tx| !block.transactions.contains(tx));
    }

    /// The leaf the controller treats as "current": the one with the
    /// greatest index, ties broken by the smallest hash, so every node
    /// computing this independently over the same tree agrees.
    fn canonical_leaf(&self, chain: &Chain) -> BlockHash {
        chain
            .get_leaves()
            .into_iter()
            .max_by(|a, b| {
                let index_a = chain.find_block_by_hash(a).map(|blk| blk.index).unwrap_or(0);
                let index_b = chain.find_block_by_hash(b).map(|blk| blk.index).unwrap_or(0);
                index_a.cmp(&index_b).then_with(|| b.to_hex().cmp(&a.to_hex()))
            })
            .unwrap_or_else(|| chain.genesis_hash())
    }

    /// Blocks from (exclusive of) `from_hash` up to the canonical leaf, for
    /// answering a peer's `GET /sync` request.
    pub async fn blocks_since(&self, from_hash: &BlockHash) -> Vec<Block> {
        let chain = self.chain.lock().await;
        let leaf = self.canonical_leaf(&chain);
        let full = chain.get_tree_list_at_hash(&leaf);
        match full.iter().position(|b| b.hash.as_ref() == Some(from_hash)) {
            Some(idx) => full[idx + 1..].to_vec(),
            None => full,
        }
    }

    pub async fn genesis_hash(&self) -> BlockHash {
        self.chain.lock().await.genesis_hash()
    }

    /// The block at this node's current canonical leaf (`GET /latest_block`).
    pub async fn latest_block(&self) -> Block {
        let chain = self.chain.lock().await;
        let leaf = self.canonical_leaf(&chain);
        chain
            .find_block_by_hash(&leaf)
            .cloned()
            .expect("canonical leaf is always present in the tree")
    }

    /// First block found at `index`, searched across every branch
    /// (`GET /block_by_index/{i}`); ties between branches are not
    /// disambiguated further since the wire route takes only an index.
    pub async fn block_by_index(&self, index: u64) -> Option<Block> {
        let chain = self.chain.lock().await;
        chain.find_blocks_by_index(index).into_iter().next().cloned()
    }

    /// `GET /block_by_hash/{h}`.
    pub async fn block_by_hash(&self, hash: &BlockHash) -> Option<Block> {
        self.chain.lock().await.find_block_by_hash(hash).cloned()
    }

    /// The branching point this node should sync from (`spec.md` §4.9): the
    /// nearest ancestor of its own canonical leaf with more than one child,
    /// or genesis if the tree has no branching at all.
    pub async fn sync_point(&self) -> BlockHash {
        let chain = self.chain.lock().await;
        let leaf = self.canonical_leaf(&chain);
        chain.get_first_branching_block(&leaf).unwrap_or_else(|| chain.genesis_hash())
    }

    pub fn public_key(&self) -> crate::types::PublicKey {
        self.key_pair.public_key()
    }

    /// The block at this node's own [`NodeController::sync_point`], for
    /// including in an outbound `/sync_request` body.
    pub async fn sync_point_block(&self) -> Block {
        let chain = self.chain.lock().await;
        let leaf = self.canonical_leaf(&chain);
        let point = chain.get_first_branching_block(&leaf).unwrap_or_else(|| chain.genesis_hash());
        chain
            .find_block_by_hash(&point)
            .cloned()
            .expect("sync point is always present in the tree")
    }

    /// Answers an inbound `/sync_request`: pushes every block (live and
    /// dead) and judgement this node has from `branch_point` onward to
    /// `reply_to`, following `spec.md` §4.9. If `branch_point` is no longer
    /// in the live tree, falls back to genesis, matching the spec's
    /// "resends from genesis" fallback.
    pub async fn handle_sync_request(&self, branch_point: BlockHash, reply_to: &str) {
        let reply_peer = crate::peer::PeerAddr(reply_to.to_string());
        let from = {
            let chain = self.chain.lock().await;
            if chain.find_block_by_hash(&branch_point).is_some() {
                branch_point
            } else {
                chain.genesis_hash()
            }
        };

        let live = self.blocks_since(&from).await;
        let dead_hashes = { self.chain.lock().await.get_dead_branches_since_blockhash(&from) };
        let dead_blocks: Vec<Block> = {
            let chain = self.chain.lock().await;
            dead_hashes.iter().filter_map(|h| chain.find_block_by_hash(h).cloned()).collect()
        };

        for block in live.iter().chain(dead_blocks.iter()) {
            if let Err(e) = self.peers.send_block(&reply_peer, block).await {
                tracing::warn!(peer = %reply_peer.0, error = %e, "failed to push synced block");
            }
            let Some(hash) = block.hash else { continue };
            let judgements = { self.chain.lock().await.judgements_for(&hash) };
            for judgement in judgements {
                if let Err(e) = self.peers.send_judgement(&reply_peer, &hash.to_hex(), &judgement).await {
                    tracing::warn!(peer = %reply_peer.0, error = %e, "failed to push synced judgement");
                }
            }
        }
    }

    /// Requests a sync from each known peer in turn, stopping at the first
    /// one that answers (`spec.md` §4.9). `self_addr` is where the peer
    /// should push the resulting backlog.
    pub async fn request_sync(&self, self_addr: &str) {
        let branch_point = self.sync_point_block().await;
        for peer in self.peers.known_peers() {
            match self.peers.request_sync(&peer, &branch_point, self_addr).await {
                Ok(()) => {
                    tracing::info!(peer = %peer.0, "sync request acknowledged");
                    return;
                }
                Err(e) => tracing::warn!(peer = %peer.0, error = %e, "sync request failed, trying next peer"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{PeerAddr, RecordingPeerNetwork};
    use crate::storage::InMemoryBlockPersistence;
    use crate::types::genesis::build_genesis_block;
    use crate::types::VaccineTx;

    fn child_of(genesis: &Block, creator: &KeyPair, timestamp: u64) -> Block {
        let mut block = Block::new(genesis, creator.public_key(), timestamp, 1);
        block.sign(creator).unwrap();
        block.update_hash();
        block
    }

    fn controller_for(
        key_pair: KeyPair,
        genesis: Block,
        spec: &GenesisSpec,
    ) -> NodeController<InMemoryBlockPersistence, RecordingPeerNetwork> {
        NodeController::new(
            key_pair,
            genesis,
            spec,
            ConsensusConfig::default(),
            InMemoryBlockPersistence::new(),
            RecordingPeerNetwork::new(vec![PeerAddr("http://127.0.0.1:9".to_string())]),
            Arc::new(MetricsRegistry::new().expect("metrics registry")),
        )
    }

    #[tokio::test]
    async fn admission_node_inserts_and_persists_a_valid_block() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec!["measles".to_string()],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();
        let block = child_of(&genesis, &admission, 1_700_000_005);
        let block_hash = block.hash.unwrap();

        let controller = controller_for(admission, genesis, &spec);
        let outcome = controller.received_new_block(block).await.unwrap();
        assert!(matches!(outcome, AddBlockOutcome::Inserted { .. }));

        let since_genesis = controller.blocks_since(&genesis_hash).await;
        assert_eq!(since_genesis.len(), 1);
        assert_eq!(since_genesis[0].hash, Some(block_hash));
    }

    #[tokio::test]
    async fn non_admission_observer_still_tracks_a_valid_block() {
        let admission = KeyPair::generate();
        let observer = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();
        let block = child_of(&genesis, &admission, 1_700_000_005);

        let controller = controller_for(observer, genesis, &spec);
        let outcome = controller.received_new_block(block).await.unwrap();
        assert!(matches!(outcome, AddBlockOutcome::Inserted { .. }));
        assert_eq!(controller.blocks_since(&genesis_hash).await.len(), 1);
    }

    #[tokio::test]
    async fn wrong_creator_is_rejected_and_not_inserted() {
        let admission_a = KeyPair::generate();
        let admission_b = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission_a.public_key(), admission_b.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();

        let history = vec![admission_a.public_key(), admission_b.public_key()];
        let mut history_sorted = history.clone();
        history_sorted.sort();
        let expected = election::expected_creator(&history_sorted, genesis.timestamp, 1_700_000_005, 5).unwrap();
        let wrong_creator = if expected == admission_a.public_key() { &admission_b } else { &admission_a };

        let block = child_of(&genesis, wrong_creator, 1_700_000_005);
        let controller = controller_for(admission_a, genesis, &spec);
        let outcome = controller.received_new_block(block).await.unwrap();
        assert!(matches!(outcome, AddBlockOutcome::WrongCreator));
        assert_eq!(controller.blocks_since(&genesis_hash).await.len(), 0);
    }

    #[tokio::test]
    async fn transaction_is_queued_and_included_in_the_next_produced_block() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec!["measles".to_string()],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();

        let mut tx = VaccineTx::new("polio".to_string(), admission.public_key(), 1_700_000_001, 1);
        tx.sign(&admission);
        let tx = Transaction::Vaccine(tx);

        let controller = controller_for(admission, genesis, &spec);
        controller.received_transaction(tx.clone()).await.unwrap();
        controller.try_produce_blocks().await.unwrap();

        let produced = controller.blocks_since(&genesis_hash).await;
        assert_eq!(produced.len(), 1);
        assert!(produced[0].transactions.contains(&tx));
    }

    #[tokio::test]
    async fn latest_block_and_lookups_reflect_the_canonical_leaf() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();
        let block = child_of(&genesis, &admission, 1_700_000_005);
        let block_hash = block.hash.unwrap();

        let controller = controller_for(admission, genesis, &spec);
        controller.received_new_block(block).await.unwrap();

        assert_eq!(controller.genesis_hash().await, genesis_hash);
        assert_eq!(controller.latest_block().await.hash, Some(block_hash));
        assert_eq!(controller.block_by_index(1).await.unwrap().hash, Some(block_hash));
        assert_eq!(controller.block_by_hash(&block_hash).await.unwrap().hash, Some(block_hash));
        assert!(controller.block_by_index(99).await.is_none());
    }

    #[tokio::test]
    async fn sync_point_is_genesis_when_the_tree_has_not_branched() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();
        let block = child_of(&genesis, &admission, 1_700_000_005);

        let controller = controller_for(admission, genesis, &spec);
        controller.received_new_block(block).await.unwrap();

        assert_eq!(controller.sync_point().await, genesis_hash);
        assert_eq!(controller.sync_point_block().await.hash, Some(genesis_hash));
    }

    #[tokio::test]
    async fn handle_sync_request_pushes_every_block_and_judgement_since_the_branch_point() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let genesis_hash = genesis.hash.unwrap();
        let block = child_of(&genesis, &admission, 1_700_000_005);
        let block_hash = block.hash.unwrap();

        let controller = controller_for(admission, genesis, &spec);
        controller.received_new_block(block).await.unwrap();
        controller.peers.sent_blocks.lock().unwrap().clear();
        controller.peers.sent_judgements.lock().unwrap().clear();

        controller.handle_sync_request(genesis_hash, "http://127.0.0.1:1234").await;

        let sent = controller.peers.sent_blocks.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hash, Some(block_hash));
        let judgements = controller.peers.sent_judgements.lock().unwrap();
        assert_eq!(judgements.len(), 1);
        assert_eq!(judgements[0].0, block_hash.to_hex());
    }

    #[tokio::test]
    async fn handle_sync_request_falls_back_to_genesis_for_an_unknown_branch_point() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        let block = child_of(&genesis, &admission, 1_700_000_005);
        let block_hash = block.hash.unwrap();

        let controller = controller_for(admission, genesis, &spec);
        controller.received_new_block(block).await.unwrap();
        controller.peers.sent_blocks.lock().unwrap().clear();

        let unknown_hash = BlockHash(crate::types::Hash256([0xab; 32]));
        controller.handle_sync_request(unknown_hash, "http://127.0.0.1:1234").await;

        let sent = controller.peers.sent_blocks.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hash, Some(block_hash));
    }
}
