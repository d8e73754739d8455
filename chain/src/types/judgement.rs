//! Judgement model (C4): a single admission's signed accept/deny vote on a
//! block it has received.
//!
//! There is no teacher precedent for this type; it follows the same
//! struct-plus-`sign`-plus-derive-serde shape as [`crate::types::tx`].

use serde::{Deserialize, Serialize};

use crate::crypto::{self, KeyPair};
use crate::types::{BlockHash, PublicKey, Signature};

/// One admission's vote on `hash_of_judged_block`.
///
/// A judgement can start as accept and later flip to deny (an admission
/// changing its mind about a block it already voted for), but never the
/// reverse: once denied, a judgement stays denied.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judgement {
    pub hash_of_judged_block: BlockHash,
    pub accept_block: bool,
    pub sender_pubkey: PublicKey,
    pub timestamp: u64,
    pub version: u32,
    pub signature: Option<Signature>,
}

impl Judgement {
    /// Builds an unsigned judgement. `accept_block` is the vote's initial
    /// value (almost always `true`: a node accepts a block it has just
    /// validated, then may later deny it once a sibling wins the tie-break).
    pub fn new(
        hash_of_judged_block: BlockHash,
        accept_block: bool,
        sender_pubkey: PublicKey,
        timestamp: u64,
        version: u32,
    ) -> Self {
        Judgement {
            hash_of_judged_block,
            accept_block,
            sender_pubkey,
            timestamp,
            version,
            signature: None,
        }
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let unsigned = (
            &self.hash_of_judged_block,
            self.accept_block,
            &self.sender_pubkey,
            self.timestamp,
            self.version,
        );
        bincode::serde::encode_to_vec(unsigned, bincode::config::standard())
            .expect("tuple of plain fields always encodes")
    }

    pub fn sign(&mut self, key_pair: &KeyPair) {
        let bytes = self.signing_bytes();
        self.signature = Some(key_pair.sign(&bytes));
    }

    /// Checks the signature only; membership in the registration cache's
    /// admission set is a separate, cache-dependent check the caller makes.
    pub fn validate(&self) -> bool {
        match &self.signature {
            Some(sig) => crypto::verify(&self.sender_pubkey, &self.signing_bytes(), sig),
            None => false,
        }
    }

    /// Flips the vote to deny and re-signs with `timestamp`. A no-op if
    /// already denying. Never call this to flip a deny back to accept; that
    /// transition is rejected by this type's own invariant, not guarded at
    /// the call site.
    pub fn deny(&mut self, key_pair: &KeyPair, timestamp: u64) {
        if !self.accept_block {
            return;
        }
        self.accept_block = false;
        self.timestamp = timestamp;
        self.sign(key_pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash256;

    #[test]
    fn sign_and_validate_round_trips() {
        let kp = KeyPair::generate();
        let mut judgement = Judgement::new(BlockHash(Hash256([1u8; 32])), true, kp.public_key(), 1, 1);
        judgement.sign(&kp);
        assert!(judgement.validate());
    }

    #[test]
    fn unsigned_judgement_does_not_validate() {
        let kp = KeyPair::generate();
        let judgement = Judgement::new(BlockHash(Hash256([1u8; 32])), true, kp.public_key(), 1, 1);
        assert!(!judgement.validate());
    }

    #[test]
    fn deny_flips_and_resigns() {
        let kp = KeyPair::generate();
        let mut judgement = Judgement::new(BlockHash(Hash256([1u8; 32])), true, kp.public_key(), 1, 1);
        judgement.sign(&kp);

        judgement.deny(&kp, 2);
        assert!(!judgement.accept_block);
        assert_eq!(judgement.timestamp, 2);
        assert!(judgement.validate());
    }

    #[test]
    fn deny_is_idempotent_once_denied() {
        let kp = KeyPair::generate();
        let mut judgement = Judgement::new(BlockHash(Hash256([1u8; 32])), true, kp.public_key(), 1, 1);
        judgement.sign(&kp);
        judgement.deny(&kp, 2);
        judgement.deny(&kp, 3);
        assert_eq!(judgement.timestamp, 2);
    }

    #[test]
    fn tampered_vote_fails_validation() {
        let kp = KeyPair::generate();
        let mut judgement = Judgement::new(BlockHash(Hash256([1u8; 32])), true, kp.public_key(), 1, 1);
        judgement.sign(&kp);
        judgement.accept_block = false;
        assert!(!judgement.validate());
    }
}
