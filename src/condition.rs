//! The `Condition` value type: an immutable `(type_id, feature_bitmask,
//! hash, max_fulfillment_length)` tuple, as spec.md §3/§4.2 defines it.
//!
//! Grounded on `coins-core`'s `macros::mark_32_byte_hash!` pattern — a
//! small fixed-shape value with a `ByteFormat`-style binary encoding and a
//! human-readable text encoding — generalized here to a four-field tuple
//! instead of a bare 32-byte newtype.

use std::io::{Read, Write};

use crate::error::{ConditionError, ConditionResult};
use crate::oer::OerWriter;

/// Preimage-SHA-256, type 0.
pub const TYPE_PREIMAGE: u16 = 0;
/// Prefix-SHA-256, type 1.
pub const TYPE_PREFIX: u16 = 1;
/// Threshold-SHA-256, type 2.
pub const TYPE_THRESHOLD: u16 = 2;
/// RSA-SHA-256, type 3.
pub const TYPE_RSA_SHA_256: u16 = 3;
/// Ed25519-SHA-512 (Ed25519 signature), type 4.
pub const TYPE_ED25519: u16 = 4;

/// Requires a SHA-256 hash somewhere in the construction.
pub const FEATURE_SHA_256: u32 = 0x01;
/// Requires support for the Preimage type.
pub const FEATURE_PREIMAGE: u32 = 0x02;
/// Requires support for the Prefix type.
pub const FEATURE_PREFIX: u32 = 0x04;
/// Requires support for the Threshold type.
pub const FEATURE_THRESHOLD: u32 = 0x08;
/// Requires support for RSA-PSS.
pub const FEATURE_RSA_PSS: u32 = 0x10;
/// Requires support for Ed25519.
pub const FEATURE_ED25519: u32 = 0x20;

/// Union of every feature bit this implementation understands.
pub const SUPPORTED_FEATURES_MASK: u32 = 0x3F;

/// The largest fulfillment length this implementation is willing to work
/// with, per spec.md §6.
pub const MAX_SAFE_FULFILLMENT_SIZE: u64 = 65_535;

/// Maximum recursion depth permitted for composite (Prefix/Threshold)
/// condition and fulfillment trees, per spec.md §5/§6.
pub const MAX_FULFILLMENT_NESTING_DEPTH: usize = 1024;

fn is_supported_type(type_id: u16) -> bool {
    matches!(
        type_id,
        TYPE_PREIMAGE | TYPE_PREFIX | TYPE_THRESHOLD | TYPE_RSA_SHA_256 | TYPE_ED25519
    )
}

/// An immutable fingerprint of a verification predicate: the type,
/// required-feature set, hash of the type-specific hash payload (or, for
/// Ed25519, the public key itself), and a committed upper bound on any
/// satisfying fulfillment's size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    type_id: u16,
    feature_bitmask: u32,
    hash: Vec<u8>,
    max_fulfillment_length: u64,
}

impl Condition {
    /// Construct a condition from its four fields. This does not validate
    /// the fields; call [`Condition::validate`] before trusting a condition
    /// that came from outside the crate.
    pub fn new(type_id: u16, feature_bitmask: u32, hash: Vec<u8>, max_fulfillment_length: u64) -> Self {
        Self {
            type_id,
            feature_bitmask,
            hash,
            max_fulfillment_length,
        }
    }

    /// The type ID (0 Preimage, 1 Prefix, 2 Threshold, 3 RSA-SHA-256,
    /// 4 Ed25519).
    pub fn type_id(&self) -> u16 {
        self.type_id
    }

    /// The union of feature bits a fulfiller must support to satisfy this
    /// condition.
    pub fn feature_bitmask(&self) -> u32 {
        self.feature_bitmask
    }

    /// The 32-byte hash of the type-specific hash payload (the public key
    /// itself, for Ed25519).
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    /// The committed upper bound on the length of any fulfillment
    /// satisfying this condition.
    pub fn max_fulfillment_length(&self) -> u64 {
        self.max_fulfillment_length
    }

    /// spec.md §4.2: the type is registered, every set feature bit is
    /// within the supported mask, and the length bound is itself within
    /// the supported range.
    pub fn validate(&self) -> ConditionResult<()> {
        if !is_supported_type(self.type_id) {
            return Err(ConditionError::UnsupportedType(self.type_id));
        }
        if self.feature_bitmask & !SUPPORTED_FEATURES_MASK != 0 {
            return Err(ConditionError::UnsupportedFeature(self.feature_bitmask));
        }
        if self.max_fulfillment_length > MAX_SAFE_FULFILLMENT_SIZE {
            return Err(ConditionError::TooLarge(format!(
                "max_fulfillment_length {} exceeds {}",
                self.max_fulfillment_length, MAX_SAFE_FULFILLMENT_SIZE
            )));
        }
        Ok(())
    }

    /// Binary form: `uint16 type_id | varUInt feature_bitmask |
    /// varOctetString hash | varUInt max_fulfillment_length`.
    pub fn write_binary<W: Write>(&self, writer: &mut W) -> ConditionResult<usize> {
        let mut written = writer.write(&self.type_id.to_be_bytes())?;
        written += writer.write_var_uint(self.feature_bitmask as u64)?;
        written += writer.write_var_octet_string(&self.hash)?;
        written += writer.write_var_uint(self.max_fulfillment_length)?;
        Ok(written)
    }

    /// Serialize to the condition's binary form.
    pub fn to_binary(&self) -> ConditionResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_binary(&mut buf)?;
        Ok(buf)
    }

    /// Parse the binary form produced by [`Condition::write_binary`].
    pub fn from_binary(bytes: &[u8]) -> ConditionResult<Self> {
        let mut reader = bytes;
        Self::read_binary(&mut reader)
    }

    /// Parse a condition directly from an open reader (used when a
    /// condition is embedded inside a larger OER structure, e.g. a
    /// `Fulfillment`'s embedded-condition reads in `threshold.rs`).
    pub fn read_binary<R: Read>(reader: &mut R) -> ConditionResult<Self> {
        let mut type_id_bytes = [0u8; 2];
        reader.read_exact(&mut type_id_bytes).map_err(|e| {
            log::debug!("truncated condition while reading type id: {}", e);
            ConditionError::ParseError(format!("truncated condition: {}", e))
        })?;
        let type_id = u16::from_be_bytes(type_id_bytes);
        let feature_bitmask = crate::oer::read_var_uint(reader)? as u32;
        let hash = crate::oer::read_var_octet_string(reader)?;
        let max_fulfillment_length = crate::oer::read_var_uint(reader)?;
        Ok(Self::new(type_id, feature_bitmask, hash, max_fulfillment_length))
    }

    /// Text form: `cc:<hex type_id>:<hex feature_bitmask>:<base64url
    /// hash>:<decimal max_fulfillment_length>`.
    ///
    /// ```
    /// use crypto_conditions::Condition;
    ///
    /// let uri = "cc:0:3:47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU:0";
    /// let condition = Condition::from_uri(uri).unwrap();
    ///
    /// assert_eq!(condition.serialize_uri(), uri);
    /// ```
    pub fn serialize_uri(&self) -> String {
        format!(
            "cc:{:x}:{:x}:{}:{}",
            self.type_id,
            self.feature_bitmask,
            base64::encode_config(&self.hash, base64::URL_SAFE_NO_PAD),
            self.max_fulfillment_length
        )
    }

    /// Parse the `cc:` URI form.
    pub fn from_uri(uri: &str) -> ConditionResult<Self> {
        let rest = uri.strip_prefix("cc:").ok_or_else(|| {
            log::debug!("condition URI missing cc: prefix");
            ConditionError::ParseError("condition URI must start with cc:".into())
        })?;
        let mut parts = rest.split(':');
        let type_id = parts
            .next()
            .ok_or_else(|| ConditionError::ParseError("missing type id".into()))?;
        let feature_bitmask = parts
            .next()
            .ok_or_else(|| ConditionError::ParseError("missing feature bitmask".into()))?;
        let hash = parts
            .next()
            .ok_or_else(|| ConditionError::ParseError("missing hash".into()))?;
        let max_fulfillment_length = parts
            .next()
            .ok_or_else(|| ConditionError::ParseError("missing max fulfillment length".into()))?;
        if parts.next().is_some() {
            return Err(ConditionError::ParseError(
                "condition URI has too many fields".into(),
            ));
        }

        let type_id = u16::from_str_radix(type_id, 16)
            .map_err(|e| ConditionError::ParseError(format!("invalid type id: {}", e)))?;
        let feature_bitmask = u32::from_str_radix(feature_bitmask, 16)
            .map_err(|e| ConditionError::ParseError(format!("invalid feature bitmask: {}", e)))?;
        let hash = base64::decode_config(hash, base64::URL_SAFE_NO_PAD)?;
        let max_fulfillment_length: u64 = max_fulfillment_length
            .parse()
            .map_err(|e| ConditionError::ParseError(format!("invalid max fulfillment length: {}", e)))?;

        Ok(Self::new(type_id, feature_bitmask, hash, max_fulfillment_length))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize_uri())
    }
}

impl serde::Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.serialize_uri())
    }
}

impl<'de> serde::Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: &str = serde::Deserialize::deserialize(deserializer)?;
        Condition::from_uri(s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}
