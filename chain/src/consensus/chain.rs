//! The block tree (C6): every block a node has ever accepted, tracked as a
//! forest rooted at genesis, with live/dead branch status and a dangling
//! queue for blocks whose parent hasn't arrived yet.
//!
//! No direct teacher equivalent — the teacher's `ConsensusEngine` only
//! tracks a single best tip. The dangling-orphan bookkeeping follows
//! `karim-agha-rensa/src/consensus/orphans.rs`'s safe `HashMap`-keyed-by-hash
//! pattern rather than that example's unsafe raw-pointer sibling
//! `forktree.rs`.

use std::collections::{HashMap, HashSet};

use crate::consensus::config::ConsensusConfig;
use crate::consensus::election;
use crate::consensus::error::ConsensusError;
use crate::registration::RegistrationCache;
use crate::types::genesis::GenesisSpec;
use crate::types::{Block, BlockHash, Judgement, PublicKey};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchStatus {
    Live,
    Dead,
}

/// One block plus everything the tree needs to reason about its branch.
#[derive(Clone, Debug)]
pub struct Node {
    pub block: Block,
    pub children: Vec<BlockHash>,
    pub status: BranchStatus,
    pub judgements: HashMap<PublicKey, Judgement>,
    pub registration_cache: RegistrationCache,
    /// Admissions in join order, as of this block, with within-block ties
    /// broken by public-key order. Used for the creator-election roster.
    pub admission_order: Vec<PublicKey>,
}

/// Result of attempting to insert a newly-received block.
#[derive(Debug)]
pub enum AddBlockOutcome {
    /// Parent not present yet; queued in the dangling map.
    Dangling,
    /// Hash already known; nothing changed.
    Duplicate,
    /// Creator did not match the expected entry in the rotation.
    WrongCreator,
    /// Structural validation failed.
    Rejected(crate::consensus::error::ValidationError),
    /// Inserted as a live child. `invalidated` is always empty under the
    /// basic insertion policy: invalidation only happens through
    /// [`Chain::update_judgements`], never as a side effect of insertion.
    Inserted { invalidated: Vec<BlockHash> },
}

/// The full block forest known to a node.
pub struct Chain {
    nodes: HashMap<BlockHash, Node>,
    dangling: HashMap<BlockHash, Vec<Block>>,
    genesis_hash: BlockHash,
}

impl Chain {
    /// Builds a tree containing only `genesis`.
    pub fn new(genesis: Block, genesis_spec: &GenesisSpec) -> Self {
        let hash = genesis.hash.expect("genesis block must already be hashed");
        let registration_cache = RegistrationCache::genesis(genesis_spec);
        let mut admission_order: Vec<PublicKey> = genesis_spec.admissions.clone();
        admission_order.sort();
        admission_order.dedup();

        let node = Node {
            block: genesis,
            children: Vec::new(),
            status: BranchStatus::Live,
            judgements: HashMap::new(),
            registration_cache,
            admission_order,
        };
        let mut nodes = HashMap::new();
        nodes.insert(hash, node);
        Chain {
            nodes,
            dangling: HashMap::new(),
            genesis_hash: hash,
        }
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_hash
    }

    pub fn find_block_by_hash(&self, hash: &BlockHash) -> Option<&Block> {
        self.nodes.get(hash).map(|n| &n.block)
    }

    pub fn find_blocks_by_index(&self, index: u64) -> Vec<&Block> {
        self.nodes
            .values()
            .filter(|n| n.block.index == index)
            .map(|n| &n.block)
            .collect()
    }

    /// Every live block with no children.
    pub fn get_leaves(&self) -> Vec<BlockHash> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.status == BranchStatus::Live && n.children.is_empty())
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn get_admissions(&self, hash: &BlockHash) -> Option<HashSet<PublicKey>> {
        self.nodes.get(hash).map(|n| n.registration_cache.admissions.clone())
    }

    pub fn registration_cache(&self, hash: &BlockHash) -> Option<&RegistrationCache> {
        self.nodes.get(hash).map(|n| &n.registration_cache)
    }

    /// The last `n` admissions as of `hash`, ordered by staleness of last
    /// production on the branch ending at `hash`: an admission that has
    /// never produced a block here sorts first, the admission that produced
    /// `hash` itself sorts last. Ties (including two admissions that have
    /// both never produced) break on ascending public key. This is the
    /// roster the creator-election rotation indexes into, so `history[0]`
    /// is always the most overdue admission rather than whoever produced
    /// most recently.
    pub fn get_block_creation_history_by_hash(&self, n: usize, hash: &BlockHash) -> Option<Vec<PublicKey>> {
        let node = self.nodes.get(hash)?;
        if node.admission_order.is_empty() {
            return None;
        }
        let roster_len = node.admission_order.len();

        let mut last_produced_at: HashMap<PublicKey, usize> = HashMap::new();
        let mut current = Some(*hash);
        let mut distance = 0usize;
        while let Some(h) = current {
            let Some(ancestor) = self.nodes.get(&h) else { break };
            last_produced_at.entry(ancestor.block.public_key.clone()).or_insert(distance);
            if last_produced_at.len() >= roster_len {
                break;
            }
            current = ancestor.block.previous_block;
            distance += 1;
        }

        let mut roster = node.admission_order.clone();
        roster.sort_by(|a, b| {
            let da = last_produced_at.get(a).copied().unwrap_or(usize::MAX);
            let db = last_produced_at.get(b).copied().unwrap_or(usize::MAX);
            db.cmp(&da).then_with(|| a.cmp(b))
        });

        let take = n.min(roster.len());
        Some(roster[roster.len() - take..].to_vec())
    }

    /// Live children of `hash`, paired with each child's creator public key.
    /// The node controller uses this to resolve a tie-break when a
    /// branching produces more than one live sibling off the same parent.
    pub fn live_children(&self, hash: &BlockHash) -> Vec<(BlockHash, PublicKey)> {
        let Some(node) = self.nodes.get(hash) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|h| {
                self.nodes
                    .get(h)
                    .filter(|n| n.status == BranchStatus::Live)
                    .map(|n| (*h, n.block.public_key.clone()))
            })
            .collect()
    }

    /// Walks up from `hash` toward genesis and returns the nearest ancestor
    /// (inclusive of `hash`) that has more than one child.
    pub fn get_first_branching_block(&self, hash: &BlockHash) -> Option<BlockHash> {
        let mut current = *hash;
        loop {
            let node = self.nodes.get(&current)?;
            if node.children.len() > 1 {
                return Some(current);
            }
            current = node.block.previous_block?;
        }
    }

    /// Inserts `block`. Structural validation and the creator check are run
    /// against the parent; if the parent is unknown the block is queued in
    /// the dangling map instead.
    pub fn add_block(&mut self, block: Block, cfg: &ConsensusConfig, now: u64) -> AddBlockOutcome {
        let Some(hash) = block.hash else {
            return AddBlockOutcome::Rejected(crate::consensus::error::ValidationError::Invalid(
                "block has no hash",
            ));
        };
        if self.nodes.contains_key(&hash) {
            return AddBlockOutcome::Duplicate;
        }
        let Some(parent_hash) = block.previous_block else {
            return AddBlockOutcome::Rejected(crate::consensus::error::ValidationError::Invalid(
                "only genesis may have no parent",
            ));
        };
        let Some(parent) = self.nodes.get(&parent_hash) else {
            self.dangling.entry(parent_hash).or_default().push(block);
            return AddBlockOutcome::Dangling;
        };

        if let Err(e) = block.validate(&parent.block, now, cfg) {
            return AddBlockOutcome::Rejected(e);
        }

        let history = self.get_block_creation_history_by_hash(parent.admission_order.len(), &parent_hash);
        if let Some(history) = history {
            let expected = election::expected_creator(&history, parent.block.timestamp, block.timestamp, cfg.block_time);
            if expected.as_ref() != Some(&block.public_key) {
                return AddBlockOutcome::WrongCreator;
            }
        }

        let registration_cache = parent.registration_cache.apply_block(&block);
        let mut admission_order = parent.admission_order.clone();
        let mut new_admissions: Vec<PublicKey> = registration_cache
            .admissions
            .difference(&parent.registration_cache.admissions)
            .cloned()
            .collect();
        new_admissions.sort();
        admission_order.extend(new_admissions);

        let node = Node {
            block,
            children: Vec::new(),
            status: BranchStatus::Live,
            judgements: HashMap::new(),
            registration_cache,
            admission_order,
        };
        self.nodes.get_mut(&parent_hash).expect("parent checked above").children.push(hash);
        self.nodes.insert(hash, node);

        AddBlockOutcome::Inserted { invalidated: Vec::new() }
    }

    /// Removes and returns any blocks that were queued waiting on `hash` as
    /// their parent, so the caller can retry inserting them.
    pub fn take_dangling_children(&mut self, hash: &BlockHash) -> Vec<Block> {
        self.dangling.remove(hash).unwrap_or_default()
    }

    /// Records `judgement` against `hash` and, once denials reach quorum,
    /// marks that block's whole subtree (and any still-dangling descendants)
    /// dead. Returns the hashes that were relocated, if any.
    ///
    /// A denial is final: if the sender already denied this block, a later
    /// judgement from them accepting it is silently dropped rather than
    /// overwriting the tally.
    pub fn update_judgements(&mut self, hash: &BlockHash, judgement: Judgement) -> Result<Vec<BlockHash>, ConsensusError> {
        if !judgement.validate() {
            return Err(ConsensusError::SignatureInvalid);
        }
        if judgement.hash_of_judged_block != *hash {
            return Err(ConsensusError::Other("judgement does not reference the given block".to_string()));
        }
        if !self.nodes.contains_key(hash) {
            return Err(ConsensusError::UnknownParent);
        }

        let parent_hash = self.nodes[hash].block.previous_block;
        let Some(parent_hash) = parent_hash else {
            // Genesis has no parent to check admission membership against;
            // still record the vote, but genesis can never be relocated.
            let node = self.nodes.get_mut(hash).unwrap();
            if let Some(existing) = node.judgements.get(&judgement.sender_pubkey) {
                if !existing.accept_block && judgement.accept_block {
                    return Ok(Vec::new());
                }
            }
            node.judgements.insert(judgement.sender_pubkey.clone(), judgement);
            return Ok(Vec::new());
        };
        let admissions_at_parent = self
            .nodes
            .get(&parent_hash)
            .map(|n| n.registration_cache.admissions.clone())
            .ok_or(ConsensusError::UnknownParent)?;
        if !admissions_at_parent.contains(&judgement.sender_pubkey) {
            return Err(ConsensusError::Other(
                "judgement sender is not an admission at the judged block's parent".to_string(),
            ));
        }

        let node = self.nodes.get_mut(hash).unwrap();
        if let Some(existing) = node.judgements.get(&judgement.sender_pubkey) {
            if !existing.accept_block && judgement.accept_block {
                // A denial is final: once an admission denies a block it can
                // never flip back to accepting it.
                return Ok(Vec::new());
            }
        }
        node.judgements.insert(judgement.sender_pubkey.clone(), judgement);
        let deny_count = node.judgements.values().filter(|j| !j.accept_block).count();
        let quorum = admissions_at_parent.len() / 2 + 1;

        if node.status == BranchStatus::Live && deny_count >= quorum {
            Ok(self.relocate_subtree(hash))
        } else {
            Ok(Vec::new())
        }
    }

    fn relocate_subtree(&mut self, root: &BlockHash) -> Vec<BlockHash> {
        let mut relocated = Vec::new();
        let mut stack = vec![*root];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&h) {
                if node.status == BranchStatus::Dead {
                    continue;
                }
                node.status = BranchStatus::Dead;
                relocated.push(h);
                stack.extend(node.children.clone());
            }
            if let Some(queued) = self.dangling.remove(&h) {
                for block in queued {
                    if let Some(bh) = block.hash {
                        relocated.push(bh);
                    }
                }
            }
        }
        relocated
    }

    /// Every judgement recorded against `hash`, in no particular order.
    pub fn judgements_for(&self, hash: &BlockHash) -> Vec<Judgement> {
        self.nodes
            .get(hash)
            .map(|n| n.judgements.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_dead_branches_since_blockhash(&self, hash: &BlockHash) -> Vec<BlockHash> {
        let mut result = Vec::new();
        let mut stack = vec![*hash];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get(&h) {
                if node.status == BranchStatus::Dead {
                    result.push(h);
                }
                stack.extend(node.children.clone());
            }
        }
        result
    }

    /// The ancestor chain from genesis to `hash`, inclusive, for sync
    /// responses.
    pub fn get_tree_list_at_hash(&self, hash: &BlockHash) -> Vec<Block> {
        let mut chain = Vec::new();
        let mut current = Some(*hash);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(&h) else { break };
            chain.push(node.block.clone());
            current = node.block.previous_block;
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::genesis::build_genesis_block;

    fn make_genesis(admission: &KeyPair) -> (Block, GenesisSpec) {
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        (build_genesis_block(&spec), spec)
    }

    fn child_block(parent: &Block, creator: &KeyPair, timestamp: u64) -> Block {
        let mut block = Block::new(parent, creator.public_key(), timestamp, 1);
        block.sign(creator).unwrap();
        block.update_hash();
        block
    }

    #[test]
    fn add_block_extends_tip_and_is_idempotent() {
        let admission = KeyPair::generate();
        let (genesis, spec) = make_genesis(&admission);
        let genesis_hash = genesis.hash.unwrap();
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let block1 = child_block(&genesis, &admission, 1_700_000_005);
        let outcome = chain.add_block(block1.clone(), &cfg, 1_700_000_010);
        assert!(matches!(outcome, AddBlockOutcome::Inserted { .. }));

        let duplicate = chain.add_block(block1, &cfg, 1_700_000_010);
        assert!(matches!(duplicate, AddBlockOutcome::Duplicate));

        assert_eq!(chain.get_leaves().len(), 1);
        assert!(chain.find_block_by_hash(&genesis_hash).is_some());
    }

    #[test]
    fn unknown_parent_is_queued_dangling() {
        let admission = KeyPair::generate();
        let (genesis, spec) = make_genesis(&admission);
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let block1 = child_block(&genesis, &admission, 1_700_000_005);
        let block2 = child_block(&block1, &admission, 1_700_000_010);

        let outcome = chain.add_block(block2.clone(), &cfg, 1_700_000_015);
        assert!(matches!(outcome, AddBlockOutcome::Dangling));

        chain.add_block(block1.clone(), &cfg, 1_700_000_015);
        let requeued = chain.take_dangling_children(&block1.hash.unwrap());
        assert_eq!(requeued.len(), 1);
    }

    #[test]
    fn deny_quorum_relocates_subtree() {
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
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let creator1 = {
            let history = chain.get_block_creation_history_by_hash(2, &genesis_hash).unwrap();
            let expected = election::expected_creator(&history, genesis.timestamp, 1_700_000_005, cfg.block_time).unwrap();
            if expected == admission_a.public_key() { &admission_a } else { &admission_b }
        };
        let block1 = child_block(&genesis, creator1, 1_700_000_005);
        let block1_hash = block1.hash.unwrap();
        chain.add_block(block1.clone(), &cfg, 1_700_000_010);

        let creator2 = {
            let history = chain.get_block_creation_history_by_hash(2, &block1_hash).unwrap();
            let expected = election::expected_creator(&history, block1.timestamp, 1_700_000_010, cfg.block_time).unwrap();
            if expected == admission_a.public_key() { &admission_a } else { &admission_b }
        };
        let block2 = child_block(&block1, creator2, 1_700_000_010);
        chain.add_block(block2.clone(), &cfg, 1_700_000_015);

        let mut j1 = Judgement::new(block1_hash, false, admission_a.public_key(), 1, 1);
        j1.sign(&admission_a);
        let relocated = chain.update_judgements(&block1_hash, j1).unwrap();
        assert!(relocated.is_empty());

        let mut j2 = Judgement::new(block1_hash, false, admission_b.public_key(), 2, 1);
        j2.sign(&admission_b);
        let relocated = chain.update_judgements(&block1_hash, j2).unwrap();
        assert!(relocated.contains(&block1_hash));
        assert!(relocated.contains(&block2.hash.unwrap()));
    }

    #[test]
    fn get_tree_list_at_hash_returns_root_to_tip() {
        let admission = KeyPair::generate();
        let (genesis, spec) = make_genesis(&admission);
        let genesis_hash = genesis.hash.unwrap();
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let block1 = child_block(&genesis, &admission, 1_700_000_005);
        let block1_hash = block1.hash.unwrap();
        chain.add_block(block1, &cfg, 1_700_000_010);

        let list = chain.get_tree_list_at_hash(&block1_hash);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].hash.unwrap(), genesis_hash);
        assert_eq!(list[1].hash.unwrap(), block1_hash);
    }

    #[test]
    fn creation_history_rotates_past_the_most_recent_producer() {
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
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let block1 = child_block(&genesis, &admission_a, 1_700_000_005);
        let block1_hash = block1.hash.unwrap();
        chain.add_block(block1.clone(), &cfg, 1_700_000_010);

        // admission_a never produced on the branch ending at genesis, so
        // either order is possible there; once it has produced block1, the
        // history for block1 must put the *other* admission first.
        let history_at_genesis = chain.get_block_creation_history_by_hash(2, &genesis_hash).unwrap();
        assert_eq!(history_at_genesis.len(), 2);

        let history_at_block1 = chain.get_block_creation_history_by_hash(2, &block1_hash).unwrap();
        assert_eq!(history_at_block1[0], admission_b.public_key());
        assert_eq!(history_at_block1[1], admission_a.public_key());

        let block2 = child_block(&block1, &admission_b, 1_700_000_010);
        chain.add_block(block2.clone(), &cfg, 1_700_000_015);

        let history_at_block2 = chain.get_block_creation_history_by_hash(2, &block2.hash.unwrap()).unwrap();
        assert_eq!(history_at_block2[0], admission_a.public_key());
        assert_eq!(history_at_block2[1], admission_b.public_key());
    }

    #[test]
    fn a_denial_cannot_be_flipped_back_to_acceptance() {
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
        let mut chain = Chain::new(genesis.clone(), &spec);
        let cfg = ConsensusConfig::default();

        let block1 = child_block(&genesis, &admission_a, 1_700_000_005);
        let block1_hash = block1.hash.unwrap();
        chain.add_block(block1, &cfg, 1_700_000_010);

        let mut deny = Judgement::new(block1_hash, false, admission_a.public_key(), 1, 1);
        deny.sign(&admission_a);
        chain.update_judgements(&block1_hash, deny).unwrap();

        let mut flip_to_accept = Judgement::new(block1_hash, true, admission_a.public_key(), 2, 2);
        flip_to_accept.sign(&admission_a);
        chain.update_judgements(&block1_hash, flip_to_accept).unwrap();

        let recorded = chain.judgements_for(&block1_hash);
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].accept_block, "a later accept must not overwrite an earlier deny");
    }
}
