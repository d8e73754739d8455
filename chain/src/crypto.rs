//! Cryptographic primitives adapter (C1).
//!
//! Every other module treats keys, signatures, and hashes as opaque byte
//! wrappers ([`crate::types::PublicKey`], [`crate::types::Signature`],
//! [`crate::types::Hash256`]); this module is the only place that knows the
//! concrete scheme (Ed25519 for signing, BLAKE3 for hashing) and the only
//! place that touches key material on disk.

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;

use crate::types::{Hash256, PublicKey, Signature};

/// A loaded or freshly generated signing keypair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        KeyPair { signing_key }
    }

    /// Returns the public key, in the byte form used throughout the chain.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes().to_vec())
    }

    /// Signs `message`, returning a detached signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes().to_vec())
    }

    /// Loads a keypair from `key_folder`, generating and persisting a new
    /// one if no key files are present yet.
    ///
    /// Two files are used: `public` and `private`, matching the layout
    /// `spec.md` §6 describes for `key_folder`. Key *generation* itself is
    /// an external collaborator's concern per `spec.md` §1; this bootstrap
    /// path only needs something deterministic to call on startup.
    pub fn load_or_generate(key_folder: &Path) -> std::io::Result<Self> {
        let public_path = key_folder.join("public");
        let private_path = key_folder.join("private");

        if public_path.exists() && private_path.exists() {
            let priv_bytes = fs::read(&private_path)?;
            let arr: [u8; SECRET_KEY_LENGTH] = priv_bytes.as_slice().try_into().map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupted private key file")
            })?;
            let signing_key = SigningKey::from_bytes(&arr);
            return Ok(KeyPair { signing_key });
        }

        fs::create_dir_all(key_folder)?;
        let keypair = KeyPair::generate();
        fs::write(&private_path, keypair.signing_key.to_bytes())?;
        fs::write(&public_path, keypair.signing_key.verifying_key().to_bytes())?;
        Ok(keypair)
    }
}

/// Verifies a detached signature over `message` under `public_key`.
///
/// Returns `false` (rather than erroring) on malformed key/signature bytes,
/// since from the caller's perspective that is indistinguishable from an
/// invalid signature.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let Ok(key_bytes): Result<[u8; 32], _> = public_key.as_bytes().try_into() else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes): Result<[u8; 64], _> = signature.as_bytes().try_into() else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}

/// Hashes `data` with the chain's canonical hash function (BLAKE3-256).
pub fn hash(data: &[u8]) -> Hash256 {
    Hash256::compute(data)
}
