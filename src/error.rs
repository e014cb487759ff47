//! Crate-wide error type for crypto-conditions.

use std::io::Error as IOError;
use thiserror::Error;

/// Every way a condition or fulfillment operation can fail.
///
/// Mirrors the error kinds in spec.md §7: each failure mode the spec
/// distinguishes gets its own variant so callers can match on *why*
/// something failed, not just that it did.
#[derive(Debug, Error)]
pub enum ConditionError {
    /// A URI was malformed, base64 was invalid, or binary input was
    /// truncated or internally inconsistent.
    #[error("parse error: {0}")]
    ParseError(String),

    /// An IO error bubbled up from a `Read`/`Write` passed to the OER codec.
    #[error(transparent)]
    IOError(#[from] IOError),

    /// `base64` decoding failed while parsing a URI.
    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),

    /// `hex` decoding failed while parsing a URI field.
    #[error(transparent)]
    HexError(#[from] hex::FromHexError),

    /// A type ID was not one of the five registered types.
    #[error("unsupported condition type: {0}")]
    UnsupportedType(u16),

    /// A feature bit fell outside the implementation's supported mask.
    #[error("unsupported feature bitmask: {0:#04x}")]
    UnsupportedFeature(u32),

    /// `sign()` or `serialize` was attempted before a required field was set.
    #[error("missing required data: {0}")]
    MissingData(&'static str),

    /// A caller supplied a value that is structurally invalid: a wrong-length
    /// key, a leading-zero modulus, a modulus outside the accepted size
    /// range, or similar.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A threshold fulfillment did not present enough fulfilled weight.
    #[error("threshold not met: needed {needed}, have {have}")]
    ThresholdNotMet {
        /// The threshold the condition committed to.
        needed: u64,
        /// The weight actually presented as fulfilled.
        have: u64,
    },

    /// A cryptographic signature check failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// A fulfillment's derived condition did not byte-exactly match the
    /// condition it was checked against.
    #[error("condition mismatch")]
    ConditionMismatch,

    /// A length exceeded a supported bound (65535 bytes, nesting depth 1024,
    /// or the condition's own `max_fulfillment_length`).
    #[error("too large: {0}")]
    TooLarge(String),
}

/// Convenience alias used throughout the crate.
pub type ConditionResult<T> = Result<T, ConditionError>;
