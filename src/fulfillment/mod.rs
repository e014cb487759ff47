//! Fulfillments: the binary proof that satisfies a condition (spec.md §3,
//! §4.3). A `Fulfillment` is a tagged union over the five registered
//! types; dispatch on `type_id` is the "registry" spec.md §4.3 describes.
//!
//! Grounded on `coins-core`'s dispatch-by-trait-impl style (each hash/digest
//! newtype implements the shared `ByteFormat` trait and the caller never
//! needs to know which one it has), generalized to five materially
//! different payload shapes via a `match` instead of a single uniform byte
//! layout.

pub mod ed25519;
pub mod preimage;
pub mod prefix;
pub mod rsa_sha256;
pub mod threshold;

pub use ed25519::Ed25519Fulfillment;
pub use preimage::PreimageFulfillment;
pub use prefix::PrefixFulfillment;
pub use rsa_sha256::RsaSha256Fulfillment;
pub use threshold::ThresholdFulfillment;

use crate::condition::{
    Condition, MAX_FULFILLMENT_NESTING_DEPTH, TYPE_ED25519, TYPE_PREFIX, TYPE_PREIMAGE,
    TYPE_RSA_SHA_256, TYPE_THRESHOLD,
};
use crate::error::{ConditionError, ConditionResult};
use crate::hashes::Sha256Hasher;
use crate::oer::{OerWriter, Reader, Writer};

/// Bounds recursion over Prefix/Threshold subfulfillment trees. Every
/// method that can recurse takes and forwards a `depth`, checking it here
/// first.
pub(crate) fn check_depth(depth: usize) -> ConditionResult<()> {
    if depth > MAX_FULFILLMENT_NESTING_DEPTH {
        Err(ConditionError::TooLarge(format!(
            "fulfillment nesting exceeds the maximum depth of {}",
            MAX_FULFILLMENT_NESTING_DEPTH
        )))
    } else {
        Ok(())
    }
}

/// The shared protocol every fulfillment type implements: construct its
/// hash payload, its wire payload, parse one back, predict its worst-case
/// size, and validate it against a message. See spec.md §9.
pub(crate) trait FulfillmentPayload: Sized {
    /// This type's registry ID.
    const TYPE_ID: u16;

    /// This fulfillment's contribution to the condition's feature bitmask
    /// (its own required feature(s) unioned with any subconditions').
    fn feature_bitmask(&self) -> u32;

    /// Write the bytes that get SHA-256'd to produce the condition's hash
    /// field (verbatim public key, for Ed25519 — see
    /// [`Ed25519Fulfillment`]).
    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()>;

    /// Write this fulfillment's wire payload (used for both the binary and
    /// URI fulfillment forms).
    fn write_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()>;

    /// Parse a wire payload back into `Self`.
    fn parse_payload(reader: &mut Reader, depth: usize) -> ConditionResult<Self>;

    /// The worst-case size of any fulfillment payload satisfying the
    /// condition this fulfillment derives.
    fn calculate_max_fulfillment_length(&self, depth: usize) -> ConditionResult<u64>;

    /// Check this fulfillment against `message`.
    fn validate(&self, message: &[u8], depth: usize) -> ConditionResult<()>;

    /// SHA-256 of the hash payload, by default (Ed25519 overrides this to
    /// return the public key itself).
    fn generate_hash(&self, depth: usize) -> ConditionResult<Vec<u8>> {
        let mut hasher = Sha256Hasher::new();
        self.write_hash_payload(&mut hasher, depth)?;
        Ok(hasher.digest().to_vec())
    }

    /// Derive this fulfillment's condition.
    fn get_condition(&self, depth: usize) -> ConditionResult<Condition> {
        Ok(Condition::new(
            Self::TYPE_ID,
            self.feature_bitmask(),
            self.generate_hash(depth)?,
            self.calculate_max_fulfillment_length(depth)?,
        ))
    }
}

/// A fulfillment: the binary proof that, together with an optional
/// message, satisfies the predicate a [`Condition`] commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfillment {
    /// Type 0.
    Preimage(PreimageFulfillment),
    /// Type 1.
    Prefix(PrefixFulfillment),
    /// Type 2.
    Threshold(ThresholdFulfillment),
    /// Type 3.
    RsaSha256(RsaSha256Fulfillment),
    /// Type 4.
    Ed25519(Ed25519Fulfillment),
}

macro_rules! dispatch {
    ($self:expr, $name:ident => $f:ident($($arg:expr),*)) => {
        match $self {
            Fulfillment::Preimage($name) => $name.$f($($arg),*),
            Fulfillment::Prefix($name) => $name.$f($($arg),*),
            Fulfillment::Threshold($name) => $name.$f($($arg),*),
            Fulfillment::RsaSha256($name) => $name.$f($($arg),*),
            Fulfillment::Ed25519($name) => $name.$f($($arg),*),
        }
    };
}

impl Fulfillment {
    pub(crate) fn feature_bitmask(&self) -> u32 {
        dispatch!(self, f => feature_bitmask())
    }

    /// This fulfillment's registry type ID.
    pub fn type_id(&self) -> u16 {
        match self {
            Fulfillment::Preimage(_) => TYPE_PREIMAGE,
            Fulfillment::Prefix(_) => TYPE_PREFIX,
            Fulfillment::Threshold(_) => TYPE_THRESHOLD,
            Fulfillment::RsaSha256(_) => TYPE_RSA_SHA_256,
            Fulfillment::Ed25519(_) => TYPE_ED25519,
        }
    }

    /// Derive the condition this fulfillment satisfies.
    pub fn get_condition(&self) -> ConditionResult<Condition> {
        self.get_condition_at_depth(0)
    }

    pub(crate) fn get_condition_at_depth(&self, depth: usize) -> ConditionResult<Condition> {
        check_depth(depth)?;
        dispatch!(self, f => get_condition(depth))
    }

    /// Check this fulfillment against `message`.
    pub fn validate(&self, message: &[u8]) -> ConditionResult<()> {
        self.validate_at_depth(message, 0)
    }

    pub(crate) fn validate_at_depth(&self, message: &[u8], depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        dispatch!(self, f => validate(message, depth))
    }

    pub(crate) fn write_payload_at_depth<W: OerWriter>(
        &self,
        writer: &mut W,
        depth: usize,
    ) -> ConditionResult<()> {
        check_depth(depth)?;
        dispatch!(self, f => write_payload(writer, depth))
    }

    /// Write `uint16 type_id | payload_bytes` into an already-open writer,
    /// continuing the stream rather than starting a fresh buffer. `Prefix`
    /// uses this directly for its (always-last) subfulfillment field;
    /// `Threshold` additionally wraps the result in a `VarOctetString` per
    /// member, since an unwrapped `Preimage` payload has no length prefix
    /// of its own and isn't otherwise self-delimiting when it isn't the
    /// last thing in the buffer.
    pub(crate) fn write_binary_at_depth<W: OerWriter>(
        &self,
        writer: &mut W,
        depth: usize,
    ) -> ConditionResult<()> {
        check_depth(depth)?;
        writer.write_all(&self.type_id().to_be_bytes())?;
        self.write_payload_at_depth(writer, depth)
    }

    pub(crate) fn to_binary_at_depth(&self, depth: usize) -> ConditionResult<Vec<u8>> {
        let mut writer = Writer::new();
        self.write_binary_at_depth(&mut writer, depth)?;
        Ok(writer.into_bytes())
    }

    /// Binary form: `uint16 type_id | payload_bytes`.
    pub fn to_binary(&self) -> ConditionResult<Vec<u8>> {
        self.to_binary_at_depth(0)
    }

    /// Read `uint16 type_id | payload_bytes` from an open reader,
    /// continuing from wherever it is positioned and leaving it positioned
    /// right after this fulfillment. The mirror of
    /// [`Fulfillment::write_binary_at_depth`].
    pub(crate) fn parse_from_reader_at_depth(
        reader: &mut Reader,
        depth: usize,
    ) -> ConditionResult<Self> {
        check_depth(depth)?;
        let type_id = reader.read_uint(2)? as u16;
        Self::parse_payload_for_type(type_id, reader, depth)
    }

    pub(crate) fn from_binary_at_depth(bytes: &[u8], depth: usize) -> ConditionResult<Self> {
        let mut reader = Reader::new(bytes);
        let fulfillment = Self::parse_from_reader_at_depth(&mut reader, depth)?;
        if !reader.is_empty() {
            log::debug!("trailing bytes after fulfillment binary payload");
            return Err(ConditionError::ParseError(
                "trailing bytes after fulfillment payload".into(),
            ));
        }
        Ok(fulfillment)
    }

    /// Parse the binary form produced by [`Fulfillment::to_binary`].
    pub fn from_binary(bytes: &[u8]) -> ConditionResult<Self> {
        Self::from_binary_at_depth(bytes, 0)
    }

    /// Text form: `cf:<hex type_id>:<base64url payload>`.
    pub fn serialize_uri(&self) -> String {
        let mut writer = Writer::new();
        // infallible: writing to an in-memory Vec<u8> cannot fail.
        self.write_payload_at_depth(&mut writer, 0)
            .expect("write to Vec<u8> cannot fail");
        format!(
            "cf:{:x}:{}",
            self.type_id(),
            base64::encode_config(writer.into_bytes(), base64::URL_SAFE_NO_PAD)
        )
    }

    /// Parse the `cf:` URI form.
    pub fn from_uri(uri: &str) -> ConditionResult<Self> {
        let rest = uri.strip_prefix("cf:").ok_or_else(|| {
            log::debug!("fulfillment URI missing cf: prefix");
            ConditionError::ParseError("fulfillment URI must start with cf:".into())
        })?;
        let mut parts = rest.splitn(2, ':');
        let type_id = parts
            .next()
            .ok_or_else(|| ConditionError::ParseError("missing type id".into()))?;
        let payload = parts.next().unwrap_or("");

        let type_id = u16::from_str_radix(type_id, 16)
            .map_err(|e| ConditionError::ParseError(format!("invalid type id: {}", e)))?;
        let payload_bytes = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)?;
        let mut reader = Reader::new(&payload_bytes);
        let fulfillment = Self::parse_payload_for_type(type_id, &mut reader, 0)?;
        if !reader.is_empty() {
            return Err(ConditionError::ParseError(
                "trailing bytes after fulfillment payload".into(),
            ));
        }
        Ok(fulfillment)
    }

    pub(crate) fn parse_payload_for_type(
        type_id: u16,
        reader: &mut Reader,
        depth: usize,
    ) -> ConditionResult<Self> {
        check_depth(depth)?;
        match type_id {
            TYPE_PREIMAGE => Ok(Fulfillment::Preimage(PreimageFulfillment::parse_payload(
                reader, depth,
            )?)),
            TYPE_PREFIX => Ok(Fulfillment::Prefix(PrefixFulfillment::parse_payload(
                reader, depth,
            )?)),
            TYPE_THRESHOLD => Ok(Fulfillment::Threshold(ThresholdFulfillment::parse_payload(
                reader, depth,
            )?)),
            TYPE_RSA_SHA_256 => Ok(Fulfillment::RsaSha256(RsaSha256Fulfillment::parse_payload(
                reader, depth,
            )?)),
            TYPE_ED25519 => Ok(Fulfillment::Ed25519(Ed25519Fulfillment::parse_payload(
                reader, depth,
            )?)),
            other => Err(ConditionError::UnsupportedType(other)),
        }
    }
}

impl From<PreimageFulfillment> for Fulfillment {
    fn from(f: PreimageFulfillment) -> Self {
        Fulfillment::Preimage(f)
    }
}

impl From<PrefixFulfillment> for Fulfillment {
    fn from(f: PrefixFulfillment) -> Self {
        Fulfillment::Prefix(f)
    }
}

impl From<ThresholdFulfillment> for Fulfillment {
    fn from(f: ThresholdFulfillment) -> Self {
        Fulfillment::Threshold(f)
    }
}

impl From<RsaSha256Fulfillment> for Fulfillment {
    fn from(f: RsaSha256Fulfillment) -> Self {
        Fulfillment::RsaSha256(f)
    }
}

impl From<Ed25519Fulfillment> for Fulfillment {
    fn from(f: Ed25519Fulfillment) -> Self {
        Fulfillment::Ed25519(f)
    }
}

impl std::fmt::Display for Fulfillment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize_uri())
    }
}
