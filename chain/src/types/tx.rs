//! Transaction model (C2): three tagged variants over a permissioned
//! vaccination-record ledger.
//!
//! Serialization is deterministic and stable: field order is the struct's
//! declared order, byte fields are carried as [`PublicKey`]/[`Signature`]
//! newtypes that hex-encode on the wire (see [`crate::types`]). Each variant
//! exposes `validate(admissions, doctors, vaccines)` mirroring the
//! registration-cache triple produced by [`crate::registration`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crypto::{self, KeyPair};
use crate::types::{Hash256, PublicKey, Signature};

/// The three roles a [`PermissionTx`] can grant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PermissionKind {
    Patient,
    Doctor,
    Admission,
}

/// A dual-signed record that `doctor_pubkey` administered `vaccine` to
/// `patient_pubkey`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaccinationTx {
    pub doctor_pubkey: PublicKey,
    pub patient_pubkey: PublicKey,
    pub vaccine: String,
    pub timestamp: u64,
    pub version: u32,
    /// Doctor signature followed by patient signature, concatenated, each
    /// over [`VaccinationTx::signing_bytes`]. `None` until both parties
    /// have signed.
    pub signature: Option<Signature>,
}

impl VaccinationTx {
    pub fn new(
        doctor_pubkey: PublicKey,
        patient_pubkey: PublicKey,
        vaccine: String,
        timestamp: u64,
        version: u32,
    ) -> Self {
        VaccinationTx {
            doctor_pubkey,
            patient_pubkey,
            vaccine,
            timestamp,
            version,
            signature: None,
        }
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let unsigned = (
            &self.doctor_pubkey,
            &self.patient_pubkey,
            &self.vaccine,
            self.timestamp,
            self.version,
        );
        bincode::serde::encode_to_vec(unsigned, bincode::config::standard())
            .expect("tuple of plain fields always encodes")
    }

    /// Signs with both parties' keys, concatenating doctor-then-patient as
    /// `spec.md` §4.2 requires.
    pub fn sign(&mut self, doctor: &KeyPair, patient: &KeyPair) {
        let bytes = self.signing_bytes();
        let mut sig = doctor.sign(&bytes).0;
        sig.extend(patient.sign(&bytes).0);
        self.signature = Some(Signature(sig));
    }

    fn verify_signatures(&self) -> bool {
        let Some(sig) = &self.signature else {
            return false;
        };
        if sig.as_bytes().len() != 128 {
            return false;
        }
        let bytes = self.signing_bytes();
        let doctor_sig = Signature(sig.as_bytes()[..64].to_vec());
        let patient_sig = Signature(sig.as_bytes()[64..].to_vec());
        crypto::verify(&self.doctor_pubkey, &bytes, &doctor_sig)
            && crypto::verify(&self.patient_pubkey, &bytes, &patient_sig)
    }

    pub fn validate(
        &self,
        _admissions: &HashSet<PublicKey>,
        doctors: &HashSet<PublicKey>,
        vaccines: &HashSet<String>,
    ) -> Result<(), String> {
        if !doctors.contains(&self.doctor_pubkey) {
            return Err("doctor not registered".to_string());
        }
        if !vaccines.contains(&self.vaccine) {
            return Err("vaccine not registered".to_string());
        }
        if !self.verify_signatures() {
            return Err("signature invalid".to_string());
        }
        Ok(())
    }
}

/// Registers `vaccine` as available, signed by an admission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaccineTx {
    pub vaccine: String,
    pub admission_pubkey: PublicKey,
    pub timestamp: u64,
    pub version: u32,
    pub signature: Option<Signature>,
}

impl VaccineTx {
    pub fn new(vaccine: String, admission_pubkey: PublicKey, timestamp: u64, version: u32) -> Self {
        VaccineTx {
            vaccine,
            admission_pubkey,
            timestamp,
            version,
            signature: None,
        }
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let unsigned = (&self.vaccine, &self.admission_pubkey, self.timestamp, self.version);
        bincode::serde::encode_to_vec(unsigned, bincode::config::standard())
            .expect("tuple of plain fields always encodes")
    }

    pub fn sign(&mut self, sender: &KeyPair) {
        let bytes = self.signing_bytes();
        self.signature = Some(sender.sign(&bytes));
    }

    pub fn validate(
        &self,
        admissions: &HashSet<PublicKey>,
        _doctors: &HashSet<PublicKey>,
        _vaccines: &HashSet<String>,
    ) -> Result<(), String> {
        if !admissions.contains(&self.admission_pubkey) {
            return Err("sender is not an admission".to_string());
        }
        let Some(sig) = &self.signature else {
            return Err("signature invalid".to_string());
        };
        if !crypto::verify(&self.admission_pubkey, &self.signing_bytes(), sig) {
            return Err("signature invalid".to_string());
        }
        Ok(())
    }
}

/// Grants `kind` to `sender_pubkey`. Self-asserted: any node may request a
/// role for its own key; trust is established by whether admissions choose
/// to include the transaction in a block, not by the transaction itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PermissionTx {
    pub kind: PermissionKind,
    pub sender_pubkey: PublicKey,
    pub timestamp: u64,
    pub version: u32,
    pub signature: Option<Signature>,
}

impl PermissionTx {
    pub fn new(kind: PermissionKind, sender_pubkey: PublicKey, timestamp: u64, version: u32) -> Self {
        PermissionTx {
            kind,
            sender_pubkey,
            timestamp,
            version,
            signature: None,
        }
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let unsigned = (&self.kind, &self.sender_pubkey, self.timestamp, self.version);
        bincode::serde::encode_to_vec(unsigned, bincode::config::standard())
            .expect("tuple of plain fields always encodes")
    }

    pub fn sign(&mut self, sender: &KeyPair) {
        let bytes = self.signing_bytes();
        self.signature = Some(sender.sign(&bytes));
    }

    /// Always structurally valid once the signature verifies; the
    /// registration sets aren't consulted (a permission is a grant, not a
    /// use of an existing role).
    pub fn validate(
        &self,
        _admissions: &HashSet<PublicKey>,
        _doctors: &HashSet<PublicKey>,
        _vaccines: &HashSet<String>,
    ) -> Result<(), String> {
        let Some(sig) = &self.signature else {
            return Err("signature invalid".to_string());
        };
        if !crypto::verify(&self.sender_pubkey, &self.signing_bytes(), sig) {
            return Err("signature invalid".to_string());
        }
        Ok(())
    }
}

/// A transaction, tagged by variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Transaction {
    Vaccination(VaccinationTx),
    Vaccine(VaccineTx),
    Permission(PermissionTx),
}

impl Transaction {
    /// Per-variant validation against the three registration sets.
    pub fn validate(
        &self,
        admissions: &HashSet<PublicKey>,
        doctors: &HashSet<PublicKey>,
        vaccines: &HashSet<String>,
    ) -> Result<(), String> {
        match self {
            Transaction::Vaccination(tx) => tx.validate(admissions, doctors, vaccines),
            Transaction::Vaccine(tx) => tx.validate(admissions, doctors, vaccines),
            Transaction::Permission(tx) => tx.validate(admissions, doctors, vaccines),
        }
    }

    /// Deterministic bytes used for both equality and hashing. Two
    /// transactions are equal iff this serialization is equal.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .expect("Transaction always encodes")
    }

    pub fn hash(&self) -> Hash256 {
        crypto::hash(&self.canonical_bytes())
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_bytes() == other.canonical_bytes()
    }
}
impl Eq for Transaction {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn vaccine_tx_round_trips_through_bincode() {
        let admission = KeyPair::generate();
        let mut tx = VaccineTx::new("measles".to_string(), admission.public_key(), 1, 1);
        tx.sign(&admission);
        let bytes = bincode::serde::encode_to_vec(&tx, bincode::config::standard()).unwrap();
        let (decoded, _): (VaccineTx, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded.vaccine, tx.vaccine);
        assert_eq!(decoded.signature, tx.signature);
    }

    #[test]
    fn vaccine_tx_validates_against_admission_set() {
        let admission = KeyPair::generate();
        let mut tx = VaccineTx::new("measles".to_string(), admission.public_key(), 1, 1);
        tx.sign(&admission);

        let mut admissions = HashSet::new();
        admissions.insert(admission.public_key());
        assert!(tx.validate(&admissions, &HashSet::new(), &HashSet::new()).is_ok());

        assert_eq!(
            tx.validate(&HashSet::new(), &HashSet::new(), &HashSet::new()),
            Err("sender is not an admission".to_string())
        );
    }

    #[test]
    fn vaccination_tx_requires_both_signatures() {
        let doctor = KeyPair::generate();
        let patient = KeyPair::generate();
        let mut tx = VaccinationTx::new(
            doctor.public_key(),
            patient.public_key(),
            "measles".to_string(),
            1,
            1,
        );
        tx.sign(&doctor, &patient);

        let mut doctors = HashSet::new();
        doctors.insert(doctor.public_key());
        let mut vaccines = HashSet::new();
        vaccines.insert("measles".to_string());

        assert!(tx.validate(&HashSet::new(), &doctors, &vaccines).is_ok());
    }

    #[test]
    fn vaccination_tx_rejects_unregistered_vaccine() {
        let doctor = KeyPair::generate();
        let patient = KeyPair::generate();
        let mut tx = VaccinationTx::new(
            doctor.public_key(),
            patient.public_key(),
            "unknown-vaccine".to_string(),
            1,
            1,
        );
        tx.sign(&doctor, &patient);

        let mut doctors = HashSet::new();
        doctors.insert(doctor.public_key());

        assert_eq!(
            tx.validate(&HashSet::new(), &doctors, &HashSet::new()),
            Err("vaccine not registered".to_string())
        );
    }

    #[test]
    fn permission_tx_is_self_asserted() {
        let requester = KeyPair::generate();
        let mut tx = PermissionTx::new(PermissionKind::Admission, requester.public_key(), 1, 1);
        tx.sign(&requester);
        assert!(tx
            .validate(&HashSet::new(), &HashSet::new(), &HashSet::new())
            .is_ok());
    }

    #[test]
    fn transaction_equality_follows_canonical_bytes() {
        let admission = KeyPair::generate();
        let mut tx_a = VaccineTx::new("measles".to_string(), admission.public_key(), 1, 1);
        tx_a.sign(&admission);
        let tx_b = tx_a.clone();
        assert_eq!(Transaction::Vaccine(tx_a), Transaction::Vaccine(tx_b));
    }
}
