//! Core domain types used by the chain.
//!
//! This module defines strongly-typed hashes, key/signature wrappers, and
//! the block/transaction/judgement model that are shared across the chain
//! implementation. The goal is to avoid "naked" byte buffers in public APIs
//! and instead use domain-specific newtypes.

use serde::{Deserialize, Serialize};

pub mod block;
pub mod genesis;
pub mod judgement;
pub mod tx;

pub use block::{Block, BlockHash};
pub use genesis::GenesisSpec;
pub use judgement::Judgement;
pub use tx::{PermissionKind, Transaction, VaccinationTx, VaccineTx, PermissionTx};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (BLAKE3-256).
///
/// This type is used as the backing representation for all fixed-size
/// hashes in the chain (block hashes, transaction hashes). It is always
/// exactly [`HASH_LEN`] bytes long.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the BLAKE3-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        Hash256(*h.as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Hex-encodes this hash, matching the wire-level canonical text form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded 32-byte hash.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash256(arr))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

/// Ed25519 public key bytes, wrapped to avoid naked `Vec<u8>` in APIs.
///
/// This type is intentionally opaque: it does not interpret or validate the
/// key material beyond length, it only carries it through the API in a
/// structured way. See [`crate::crypto`] for the adapter that actually
/// signs and verifies with these bytes.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    /// Returns the raw public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encodes this key for the canonical wire text form.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses a hex-encoded public key.
    pub fn from_hex(s: &str) -> Option<Self> {
        Some(PublicKey(hex::decode(s).ok()?))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Ed25519 signature bytes.
///
/// Detached signatures over a canonical serialization; the exact encoding
/// signed over is defined by the transaction/block/judgement code.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encodes this signature for the canonical wire text form.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses a hex-encoded signature.
    pub fn from_hex(s: &str) -> Option<Self> {
        Some(Signature(hex::decode(s).ok()?))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}
