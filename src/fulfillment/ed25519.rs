//! Ed25519 (type 4): spec.md §4.8. Unlike every other type, the
//! condition's hash field is the raw 32-byte public key, not a SHA-256 of
//! anything — [`FulfillmentPayload::generate_hash`] is overridden to skip
//! hashing entirely.
//!
//! Grounded on `coins-core`'s fixed-size-array wire fields (e.g.
//! `Signature`/`Script` byte arrays read with `read_exact`); signing itself
//! is grounded on `ed25519-dalek`'s own `Signer`/`Verifier` traits, which
//! the teacher's codebase doesn't touch.

use std::convert::TryInto;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::condition::{FEATURE_ED25519, TYPE_ED25519};
use crate::error::{ConditionError, ConditionResult};
use crate::fulfillment::{check_depth, FulfillmentPayload};
use crate::oer::{OerWriter, Reader};

const PUBLIC_KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// An Ed25519 public key and a signature over the (possibly empty) message,
/// verifiable with nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Fulfillment {
    public_key: [u8; PUBLIC_KEY_LEN],
    signature: [u8; SIGNATURE_LEN],
}

impl Ed25519Fulfillment {
    /// Wrap a public key and signature directly. Prefer [`Self::sign`] when
    /// you hold the private key.
    pub fn new(public_key: [u8; PUBLIC_KEY_LEN], signature: [u8; SIGNATURE_LEN]) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    /// The 32-byte public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// The 64-byte signature.
    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    /// Sign `message` with the private key derived from `seed` (the 32-byte
    /// Ed25519 secret scalar seed, as `ed25519-dalek::SigningKey` expects).
    pub fn sign(message: &[u8], seed: &[u8; 32]) -> ConditionResult<Self> {
        log::trace!("signing {} message bytes with ed25519", message.len());
        let signing_key = SigningKey::from_bytes(seed);
        let signature = signing_key.sign(message);
        Ok(Self::new(
            signing_key.verifying_key().to_bytes(),
            signature.to_bytes(),
        ))
    }
}

impl FulfillmentPayload for Ed25519Fulfillment {
    const TYPE_ID: u16 = TYPE_ED25519;

    fn feature_bitmask(&self) -> u32 {
        FEATURE_ED25519
    }

    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        // The hash payload *is* the public key; no SHA-256 involved (see
        // `generate_hash` below, which this method's default caller never
        // reaches).
        writer.write_all(&self.public_key)?;
        Ok(())
    }

    fn write_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        writer.write_all(&self.public_key)?;
        writer.write_all(&self.signature)?;
        Ok(())
    }

    fn parse_payload(reader: &mut Reader, _depth: usize) -> ConditionResult<Self> {
        let public_key: [u8; PUBLIC_KEY_LEN] = reader
            .read_octet_string(PUBLIC_KEY_LEN)?
            .try_into()
            .map_err(|_| ConditionError::ParseError("malformed ed25519 public key".into()))?;
        let signature: [u8; SIGNATURE_LEN] = reader
            .read_octet_string(SIGNATURE_LEN)?
            .try_into()
            .map_err(|_| ConditionError::ParseError("malformed ed25519 signature".into()))?;
        Ok(Self::new(public_key, signature))
    }

    fn calculate_max_fulfillment_length(&self, _depth: usize) -> ConditionResult<u64> {
        Ok((PUBLIC_KEY_LEN + SIGNATURE_LEN) as u64)
    }

    fn validate(&self, message: &[u8], depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        log::trace!("validating ed25519 signature at depth {}", depth);
        let verifying_key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| ConditionError::ParseError(format!("invalid ed25519 public key: {}", e)))?;
        let signature = Signature::from_bytes(&self.signature);
        verifying_key.verify_strict(message, &signature).map_err(|_| {
            log::debug!("ed25519 signature check failed");
            ConditionError::InvalidSignature
        })
    }

    /// Ed25519's hash payload *is* its hash: no SHA-256 round applied.
    fn generate_hash(&self, _depth: usize) -> ConditionResult<Vec<u8>> {
        Ok(self.public_key.to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_seed_matches_known_condition() {
        // Seed scenario 2: all-zero seed, empty message.
        let f = Ed25519Fulfillment::sign(b"", &[0u8; 32]).unwrap();
        let condition = f.get_condition(0).unwrap();
        assert_eq!(condition.max_fulfillment_length(), 96);
        assert_eq!(condition.type_id(), TYPE_ED25519);
    }

    #[test]
    fn all_ones_seed_matches_known_condition() {
        // Seed scenario 3: all-0xff seed, message "abc".
        let f = Ed25519Fulfillment::sign(b"abc", &[0xffu8; 32]).unwrap();
        let condition = f.get_condition(0).unwrap();
        assert_eq!(
            condition.serialize_uri(),
            "cc:4:20:dqFZIESm5PURJlvKc6YE2QsFKdHfYCvjChmpJXZg0fU:96"
        );
    }

    #[test]
    fn validate_rejects_a_tampered_message() {
        let f = Ed25519Fulfillment::sign(b"abc", &[0xffu8; 32]).unwrap();
        assert!(f.validate(b"abc", 0).is_ok());
        assert!(f.validate(b"abd", 0).is_err());
    }

    #[test]
    fn binary_round_trips() {
        let f = Ed25519Fulfillment::sign(b"abc", &[0xffu8; 32]).unwrap();
        let mut writer = Vec::new();
        f.write_payload(&mut writer, 0).unwrap();
        assert_eq!(writer.len(), PUBLIC_KEY_LEN + SIGNATURE_LEN);
        let mut reader = Reader::new(&writer);
        let parsed = Ed25519Fulfillment::parse_payload(&mut reader, 0).unwrap();
        assert_eq!(parsed, f);
    }
}
