//! Registration cache engine (C5): the running admissions/doctors/vaccines
//! sets produced by folding a branch's transactions over the genesis seed.
//!
//! No direct teacher equivalent exists; the fold shape mirrors
//! `chain/src/validation/ml.rs`'s extract-dedup pattern (walk a sequence of
//! domain records, dedup into sets), applied to transactions instead of ML
//! artefacts.

use std::collections::HashSet;

use crate::types::genesis::GenesisSpec;
use crate::types::{Block, PermissionKind, PublicKey, Transaction};

/// The three monotonically-growing sets a branch's registration state
/// consists of, per `spec.md` §4.4.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegistrationCache {
    pub admissions: HashSet<PublicKey>,
    pub doctors: HashSet<PublicKey>,
    pub vaccines: HashSet<String>,
}

impl RegistrationCache {
    /// The cache at genesis: the network's baked-in initial sets, before any
    /// block has been folded in.
    pub fn genesis(spec: &GenesisSpec) -> Self {
        RegistrationCache {
            admissions: spec.admissions.iter().cloned().collect(),
            doctors: spec.doctors.iter().cloned().collect(),
            vaccines: spec.vaccines.iter().cloned().collect(),
        }
    }

    /// Folds `block`'s transactions into a fresh cache extending `self`.
    /// `self` is left untouched; the caller decides whether/how to memoize
    /// the result (see `chain::consensus::chain::Node`, which stores it
    /// once per block at insertion time).
    pub fn apply_block(&self, block: &Block) -> RegistrationCache {
        let mut next = self.clone();
        for tx in &block.transactions {
            if let Transaction::Permission(permission) = tx {
                match permission.kind {
                    PermissionKind::Admission => {
                        next.admissions.insert(permission.sender_pubkey.clone());
                    }
                    PermissionKind::Doctor => {
                        next.doctors.insert(permission.sender_pubkey.clone());
                    }
                    PermissionKind::Patient => {
                        // No registration set tracks patients; a patient
                        // grant only matters at the point a vaccination
                        // transaction checks signatures.
                    }
                }
            }
            if let Transaction::Vaccine(vaccine) = tx {
                next.vaccines.insert(vaccine.vaccine.clone());
            }
        }
        next
    }
}
