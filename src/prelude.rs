//! Re-exports of the types most callers need.
pub use crate::{
    api::{
        from_condition_uri, from_fulfillment_uri, fulfillment_to_condition, validate_condition,
        validate_fulfillment,
    },
    condition::Condition,
    error::{ConditionError, ConditionResult},
    fulfillment::{
        Ed25519Fulfillment, Fulfillment, PreimageFulfillment, PrefixFulfillment,
        RsaSha256Fulfillment, ThresholdFulfillment,
    },
};
