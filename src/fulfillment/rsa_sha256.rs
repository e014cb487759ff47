//! RSA-SHA-256 (type 3): spec.md §4.7. RSA-PSS with SHA-256, MGF1-SHA-256,
//! salt length 32, and a fixed public exponent of 65537.
//!
//! Grounded on `coins-core`'s PEM/DER handling conventions where they
//! exist; the `rsa`/`pkcs8` crates supply the actual BER parsing and PSS
//! primitives the teacher's codebase never needed.

use std::convert::TryFrom;

use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::{Signature as PssSignature, SigningKey, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::condition::{FEATURE_RSA_PSS, TYPE_RSA_SHA_256};
use crate::error::{ConditionError, ConditionResult};
use crate::fulfillment::FulfillmentPayload;
use crate::oer::{OerWriter, Predictor, Reader};

const MIN_MODULUS_LEN: usize = 128;
const MAX_MODULUS_LEN: usize = 512;
const PUBLIC_EXPONENT: u64 = 65_537;
const SALT_LEN: usize = 32;

/// An RSA-PSS-SHA256 signature fulfillment: a modulus and a signature of
/// the same byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaSha256Fulfillment {
    modulus: Vec<u8>,
    signature: Vec<u8>,
}

fn validate_modulus(modulus: &[u8]) -> ConditionResult<()> {
    if modulus.len() < MIN_MODULUS_LEN || modulus.len() > MAX_MODULUS_LEN {
        return Err(ConditionError::InvalidArgument(format!(
            "RSA modulus must be {}-{} bytes, got {}",
            MIN_MODULUS_LEN,
            MAX_MODULUS_LEN,
            modulus.len()
        )));
    }
    if modulus[0] == 0 {
        return Err(ConditionError::InvalidArgument(
            "RSA modulus must not have a leading zero byte".into(),
        ));
    }
    Ok(())
}

impl RsaSha256Fulfillment {
    /// Wrap an already-known modulus and signature. Fails if the modulus
    /// is out of the supported size range or the two lengths disagree.
    pub fn new(modulus: Vec<u8>, signature: Vec<u8>) -> ConditionResult<Self> {
        validate_modulus(&modulus)?;
        if signature.len() != modulus.len() {
            return Err(ConditionError::InvalidArgument(
                "RSA signature length must equal modulus length".into(),
            ));
        }
        Ok(Self { modulus, signature })
    }

    /// The RSA modulus, 128-512 bytes, no leading zero byte.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// The RSA-PSS signature, equal in length to the modulus.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Sign `message` with the RSA private key in `private_key_pem`
    /// (PKCS#8 PEM). Rejects keys whose public exponent isn't 65537.
    pub fn sign(message: &[u8], private_key_pem: &str) -> ConditionResult<Self> {
        log::trace!("signing {} message bytes with rsa-pss-sha256", message.len());
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| ConditionError::InvalidArgument(format!("invalid RSA private key: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);
        if public_key.e() != &BigUint::from(PUBLIC_EXPONENT) {
            return Err(ConditionError::InvalidArgument(format!(
                "RSA public exponent must be {}",
                PUBLIC_EXPONENT
            )));
        }
        let modulus = public_key.n().to_bytes_be();
        validate_modulus(&modulus)?;

        let signing_key = SigningKey::<Sha256>::new_with_salt_len(private_key, SALT_LEN);
        let mut rng = rand_core::OsRng;
        let signature = signing_key.sign_with_rng(&mut rng, message);
        let signature_bytes = signature.to_bytes().to_vec();

        Self::new(modulus, signature_bytes)
    }
}

impl FulfillmentPayload for RsaSha256Fulfillment {
    const TYPE_ID: u16 = TYPE_RSA_SHA_256;

    fn feature_bitmask(&self) -> u32 {
        FEATURE_RSA_PSS
    }

    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        writer.write_var_octet_string(&self.modulus)?;
        Ok(())
    }

    fn write_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        writer.write_var_octet_string(&self.modulus)?;
        writer.write_var_octet_string(&self.signature)?;
        Ok(())
    }

    fn parse_payload(reader: &mut Reader, _depth: usize) -> ConditionResult<Self> {
        let modulus = reader.read_var_octet_string()?;
        let signature = reader.read_var_octet_string()?;
        Self::new(modulus, signature)
    }

    fn calculate_max_fulfillment_length(&self, _depth: usize) -> ConditionResult<u64> {
        // The modulus and the signature are predicted separately — not the
        // modulus twice — since their VarOctetString framing costs differ
        // only when their lengths differ, which never happens here, but
        // this keeps the formula honest if that ever changes.
        let mut predictor = Predictor::new();
        predictor.write_var_octet_string(&self.modulus)?;
        predictor.write_var_octet_string(&self.signature)?;
        Ok(predictor.len() as u64)
    }

    fn validate(&self, message: &[u8], _depth: usize) -> ConditionResult<()> {
        log::trace!("validating rsa-pss-sha256 signature");
        let public_key = RsaPublicKey::new(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from(PUBLIC_EXPONENT),
        )
        .map_err(|e| ConditionError::ParseError(format!("invalid RSA modulus: {}", e)))?;
        let verifying_key: VerifyingKey<Sha256> =
            VerifyingKey::new_with_salt_len(public_key, SALT_LEN);
        let signature = PssSignature::try_from(self.signature.as_slice())
            .map_err(|_| ConditionError::ParseError("malformed RSA-PSS signature".into()))?;
        verifying_key.verify(message, &signature).map_err(|_| {
            log::debug!("rsa-pss-sha256 signature check failed");
            ConditionError::InvalidSignature
        })
    }
}
