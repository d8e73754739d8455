//! Block model (C3): header-ish flat fields, content hashing, signing, and
//! structural validation.
//!
//! Serialization for hashing/signing purposes is done with **bincode 2**
//! using the `serde` integration (`bincode::serde::encode_to_vec`) with an
//! explicit `standard()` config, following the same canonical-encoding
//! convention the rest of this crate uses for content hashes.

use serde::{Deserialize, Serialize};

use crate::consensus::config::ConsensusConfig;
use crate::consensus::error::ValidationError;
use crate::crypto::{self, KeyPair};
use crate::types::{Hash256, PublicKey, Signature, Transaction};

/// Strongly-typed block hash: a BLAKE3-256 digest over a block's canonical
/// serialization, including its signature.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub Hash256);

impl BlockHash {
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        Hash256::from_hex(s).map(BlockHash)
    }
}

impl std::fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

/// A block: `index` is monotone within a branch (genesis = 0),
/// `previous_block` is `None` only for genesis, `public_key` identifies the
/// creator, and `hash`/`signature` are filled by [`Block::sign`]/
/// [`Block::update_hash`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_block: Option<BlockHash>,
    pub timestamp: u64,
    pub version: u32,
    pub public_key: PublicKey,
    pub transactions: Vec<Transaction>,
    pub signature: Option<Signature>,
    pub hash: Option<BlockHash>,
}

impl Block {
    /// Builds an unsigned, unhashed block extending `parent`.
    pub fn new(parent: &Block, creator_pubkey: PublicKey, timestamp: u64, version: u32) -> Self {
        let parent_hash = parent.hash.expect("parent block must already be hashed");
        Block {
            index: parent.index + 1,
            previous_block: Some(parent_hash),
            timestamp,
            version,
            public_key: creator_pubkey,
            transactions: Vec::new(),
            signature: None,
            hash: None,
        }
    }

    /// Appends `tx`, failing if the block is already at `block_size`.
    pub fn add_transaction(&mut self, tx: Transaction, block_size: usize) -> Result<(), ValidationError> {
        if self.transactions.len() >= block_size {
            return Err(ValidationError::TooManyTransactions);
        }
        self.transactions.push(tx);
        Ok(())
    }

    /// Bytes covering every field except `signature` and `hash`: what gets
    /// signed by the creator.
    fn signing_bytes(&self) -> Vec<u8> {
        let unsigned = (
            self.index,
            &self.previous_block,
            self.timestamp,
            self.version,
            &self.public_key,
            &self.transactions,
        );
        bincode::serde::encode_to_vec(unsigned, bincode::config::standard())
            .expect("tuple of plain fields always encodes")
    }

    /// Bytes covering every field except `hash`: `signing_bytes` plus the
    /// signature, per `spec.md` §4.1.
    fn hashing_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signing_bytes();
        if let Some(sig) = &self.signature {
            bytes.extend(sig.as_bytes());
        }
        bytes
    }

    /// Signs the block with `key_pair`. Fails if already signed.
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), &'static str> {
        if self.signature.is_some() {
            return Err("block is already signed");
        }
        let bytes = self.signing_bytes();
        self.signature = Some(key_pair.sign(&bytes));
        Ok(())
    }

    /// Computes and stores `hash` from `hashing_bytes`.
    pub fn update_hash(&mut self) {
        self.hash = Some(BlockHash(crypto::hash(&self.hashing_bytes())));
    }

    /// Structural validation against `parent` (`spec.md` §4.1, rules 1-8,
    /// minus rule 8's hash check, which is covered by `recompute_hash`).
    pub fn validate(&self, parent: &Block, now: u64, cfg: &ConsensusConfig) -> Result<(), ValidationError> {
        let parent_hash = parent.hash.ok_or(ValidationError::Invalid("parent has no hash"))?;

        if self.index != parent.index + 1 {
            return Err(ValidationError::Invalid("index does not follow parent"));
        }
        if self.previous_block != Some(parent_hash) {
            return Err(ValidationError::Invalid("previous_block does not reference parent"));
        }
        if self.version != cfg.version {
            return Err(ValidationError::Invalid("version mismatch"));
        }
        const ALLOWED_SKEW_SECS: u64 = 2;
        if self.timestamp > now + ALLOWED_SKEW_SECS {
            return Err(ValidationError::Invalid("timestamp is in the future"));
        }
        let Some(sig) = &self.signature else {
            return Err(ValidationError::Invalid("signature missing"));
        };
        if !crypto::verify(&self.public_key, &self.signing_bytes(), sig) {
            return Err(ValidationError::Invalid("signature invalid"));
        }
        if self.transactions.len() > cfg.block_size {
            return Err(ValidationError::TooManyTransactions);
        }
        let mut seen = std::collections::HashSet::new();
        for tx in &self.transactions {
            if !seen.insert(tx.canonical_bytes()) {
                return Err(ValidationError::Invalid("duplicate transaction in block"));
            }
        }
        let recomputed = BlockHash(crypto::hash(&self.hashing_bytes()));
        if self.hash != Some(recomputed) {
            return Err(ValidationError::Invalid("hash does not match content"));
        }
        Ok(())
    }
}
