//! Crypto-conditions: compact, portable cryptographic commitments for
//! conditional payments and escrow.
//!
//! A [`condition::Condition`] is a fingerprint of a verification predicate;
//! a [`fulfillment::Fulfillment`] is the proof that satisfies one. The
//! [`api`] module exposes the handful of entry points most callers need;
//! the individual fulfillment types under [`fulfillment`] are available
//! directly for callers building or inspecting proofs.
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod api;
pub mod condition;
pub mod error;
pub mod fulfillment;
pub mod hashes;
pub mod oer;
pub mod prelude;

pub use api::{
    from_condition_uri, from_fulfillment_uri, fulfillment_to_condition, validate_condition,
    validate_fulfillment,
};
pub use condition::Condition;
pub use error::{ConditionError, ConditionResult};
pub use fulfillment::Fulfillment;
