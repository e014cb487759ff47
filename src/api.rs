//! High-level entry points (spec.md §4.9): the handful of functions most
//! callers need instead of reaching into `Condition`/`Fulfillment`
//! directly. Grounded on `coins-core`'s pattern of exposing free functions
//! over a type's own inherent methods only when a multi-step check
//! (parse, derive, compare) is common enough to deserve a one-call name.

use crate::condition::Condition;
use crate::error::{ConditionError, ConditionResult};
use crate::fulfillment::Fulfillment;
use crate::oer::Predictor;

/// Parse a `cc:` condition URI and check spec.md §4.2's structural
/// invariants (registered type, supported feature bits, length bound
/// within range).
pub fn validate_condition(uri: &str) -> ConditionResult<Condition> {
    let condition = Condition::from_uri(uri)?;
    condition.validate()?;
    Ok(condition)
}

/// Parse a `cf:` fulfillment URI.
pub fn from_fulfillment_uri(uri: &str) -> ConditionResult<Fulfillment> {
    Fulfillment::from_uri(uri)
}

/// Parse a `cc:` condition URI without validating it.
pub fn from_condition_uri(uri: &str) -> ConditionResult<Condition> {
    Condition::from_uri(uri)
}

/// Derive the condition a fulfillment satisfies.
pub fn fulfillment_to_condition(fulfillment: &Fulfillment) -> ConditionResult<Condition> {
    fulfillment.get_condition()
}

/// Check `fulfillment` against `condition` and `message`: the fulfillment's
/// derived condition must byte-exactly equal `condition` (spec.md §4.9 —
/// this is what actually binds the proof to the specific commitment, not
/// just to *some* condition of the same shape), the fulfillment's encoded
/// length must fit the bound `condition` committed to, and
/// [`Fulfillment::validate`] must accept `message`.
pub fn validate_fulfillment(
    fulfillment: &Fulfillment,
    condition: &Condition,
    message: &[u8],
) -> ConditionResult<()> {
    condition.validate()?;
    let derived = fulfillment.get_condition()?;
    if &derived != condition {
        return Err(ConditionError::ConditionMismatch);
    }
    let mut predictor = Predictor::new();
    fulfillment.write_payload_at_depth(&mut predictor, 0)?;
    let len = predictor.len() as u64;
    if len > condition.max_fulfillment_length() {
        return Err(ConditionError::TooLarge(format!(
            "fulfillment length {} exceeds condition's max_fulfillment_length {}",
            len,
            condition.max_fulfillment_length()
        )));
    }
    fulfillment.validate(message)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fulfillment::PreimageFulfillment;

    #[test]
    fn round_trips_a_preimage_fulfillment_against_its_condition() {
        let fulfillment: Fulfillment = PreimageFulfillment::new(b"secret".to_vec()).into();
        let condition = fulfillment_to_condition(&fulfillment).unwrap();
        assert!(validate_fulfillment(&fulfillment, &condition, b"anything").is_ok());
    }

    #[test]
    fn rejects_a_fulfillment_for_the_wrong_condition() {
        let fulfillment: Fulfillment = PreimageFulfillment::new(b"secret".to_vec()).into();
        let other_condition =
            fulfillment_to_condition(&PreimageFulfillment::new(b"different".to_vec()).into())
                .unwrap();
        assert!(matches!(
            validate_fulfillment(&fulfillment, &other_condition, b"anything"),
            Err(ConditionError::ConditionMismatch)
        ));
    }

    #[test]
    fn validate_condition_round_trips_a_known_uri() {
        let uri = "cc:0:3:47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU:0";
        let condition = validate_condition(uri).unwrap();
        assert_eq!(condition.serialize_uri(), uri);
    }

    #[test]
    fn validate_condition_rejects_unsupported_feature_bits() {
        let uri = "cc:0:40:47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU:0";
        assert!(matches!(
            validate_condition(uri),
            Err(ConditionError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn accepts_a_fulfillment_exactly_at_its_committed_bound() {
        // The committed `max_fulfillment_length` on a Preimage condition is
        // exactly the preimage's length, so a correctly derived condition
        // always passes the length check with no slack either way.
        let fulfillment: Fulfillment = PreimageFulfillment::new(b"secret".to_vec()).into();
        let condition = fulfillment_to_condition(&fulfillment).unwrap();
        assert_eq!(condition.max_fulfillment_length(), 6);
        assert!(validate_fulfillment(&fulfillment, &condition, b"anything").is_ok());
    }

    #[test]
    fn from_fulfillment_uri_round_trips() {
        let fulfillment: Fulfillment = PreimageFulfillment::new(b"secret".to_vec()).into();
        let uri = fulfillment.serialize_uri();
        let parsed = from_fulfillment_uri(&uri).unwrap();
        assert_eq!(parsed, fulfillment);
    }
}
