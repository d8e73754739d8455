//! Genesis block construction.
//!
//! The genesis block itself carries no transactions: the chain's initial
//! admissions/doctors/vaccines are configuration, not ledger content, and
//! are seeded directly into the root [`crate::registration::RegistrationCache`]
//! (see `spec.md` §3/§4.4) rather than encoded as unsigned bootstrap
//! transactions. Grounded on `original_source/blockchain/full_client.py`'s
//! genesis bootstrap, which reads the same three sets from configuration.

use crate::types::{Block, PublicKey};

/// The configuration-time inputs baked into a network's genesis block.
#[derive(Clone, Debug)]
pub struct GenesisSpec {
    pub admissions: Vec<PublicKey>,
    pub doctors: Vec<PublicKey>,
    pub vaccines: Vec<String>,
    pub timestamp: u64,
    pub version: u32,
}

/// Builds the (unsigned, already-hashed) genesis block for `spec`.
///
/// Genesis has no creator to sign over it in the usual sense; every node
/// participating in a network must agree on the same `GenesisSpec` and so
/// arrives at the same block independently, the way every full node in
/// `original_source/` loads the same bootstrap configuration.
pub fn build_genesis_block(spec: &GenesisSpec) -> Block {
    let public_key = spec.admissions.first().cloned().unwrap_or(PublicKey(Vec::new()));
    let mut block = Block {
        index: 0,
        previous_block: None,
        timestamp: spec.timestamp,
        version: spec.version,
        public_key,
        transactions: Vec::new(),
        signature: None,
        hash: None,
    };
    block.update_hash();
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn genesis_block_has_no_parent_and_index_zero() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec!["measles".to_string()],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        assert_eq!(genesis.index, 0);
        assert!(genesis.previous_block.is_none());
        assert!(genesis.hash.is_some());
    }

    #[test]
    fn genesis_block_is_deterministic_given_same_spec() {
        let admission = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![admission.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1_700_000_000,
            version: 1,
        };
        let a = build_genesis_block(&spec);
        let b = build_genesis_block(&spec);
        assert_eq!(a.hash, b.hash);
    }
}
