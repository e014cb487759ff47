//! Prefix-SHA-256 (type 1): spec.md §4.5. Prepends fixed bytes to the
//! message before delegating to a wrapped subfulfillment.

use crate::condition::{FEATURE_PREFIX, FEATURE_SHA_256, TYPE_PREFIX};
use crate::error::ConditionResult;
use crate::fulfillment::{check_depth, Fulfillment, FulfillmentPayload};
use crate::oer::{OerWriter, Predictor, Reader};

/// Wraps a subfulfillment, requiring `prefix` to be prepended to the
/// message before the subfulfillment is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixFulfillment {
    prefix: Vec<u8>,
    subfulfillment: Box<Fulfillment>,
}

impl PrefixFulfillment {
    /// Wrap `subfulfillment`, requiring `prefix` before the message.
    pub fn new(prefix: Vec<u8>, subfulfillment: Fulfillment) -> Self {
        Self {
            prefix,
            subfulfillment: Box::new(subfulfillment),
        }
    }

    /// The fixed prefix bytes.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// The wrapped subfulfillment.
    pub fn subfulfillment(&self) -> &Fulfillment {
        &self.subfulfillment
    }

    fn prefixed_message(&self, message: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(self.prefix.len() + message.len());
        combined.extend_from_slice(&self.prefix);
        combined.extend_from_slice(message);
        combined
    }
}

impl FulfillmentPayload for PrefixFulfillment {
    const TYPE_ID: u16 = TYPE_PREFIX;

    fn feature_bitmask(&self) -> u32 {
        FEATURE_PREFIX | FEATURE_SHA_256 | self.subfulfillment.feature_bitmask()
    }

    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        writer.write_var_octet_string(&self.prefix)?;
        let subcondition = self.subfulfillment.get_condition_at_depth(depth + 1)?;
        subcondition.write_binary(writer)?;
        Ok(())
    }

    fn write_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        writer.write_var_octet_string(&self.prefix)?;
        self.subfulfillment
            .write_binary_at_depth(writer, depth + 1)?;
        Ok(())
    }

    fn parse_payload(reader: &mut Reader, depth: usize) -> ConditionResult<Self> {
        check_depth(depth)?;
        let prefix = reader.read_var_octet_string()?;
        let subfulfillment = Fulfillment::parse_from_reader_at_depth(reader, depth + 1)?;
        Ok(Self::new(prefix, subfulfillment))
    }

    fn calculate_max_fulfillment_length(&self, depth: usize) -> ConditionResult<u64> {
        check_depth(depth)?;
        let mut predictor = Predictor::new();
        predictor.write_var_octet_string(&self.prefix)?;
        let framing = predictor.len() as u64;
        let sub_condition = self.subfulfillment.get_condition_at_depth(depth + 1)?;
        Ok(framing + sub_condition.max_fulfillment_length())
    }

    fn validate(&self, message: &[u8], depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        let effective_message = self.prefixed_message(message);
        self.subfulfillment
            .validate_at_depth(&effective_message, depth + 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fulfillment::PreimageFulfillment;

    #[test]
    fn prefix_over_ed25519_matches_known_condition() {
        use crate::fulfillment::Ed25519Fulfillment;

        let signing_seed = [0xffu8; 32];
        let ed25519 = Ed25519Fulfillment::sign(b"abc", &signing_seed).unwrap();
        // Sanity: this is the fulfillment from seed scenario 3.
        let ed_condition = ed25519.get_condition(0).unwrap();
        assert_eq!(
            ed_condition.serialize_uri(),
            "cc:4:20:dqFZIESm5PURJlvKc6YE2QsFKdHfYCvjChmpJXZg0fU:96"
        );

        let prefix = PrefixFulfillment::new(b"2016:".to_vec(), ed25519.into());
        let condition = prefix.get_condition(0).unwrap();
        assert_eq!(
            condition.serialize_uri(),
            "cc:1:25:7myveZs3EaZMMuez-3kq6u69BDNYMYRMi_VF9yIuFLc:102"
        );
    }

    #[test]
    fn validate_prepends_the_prefix() {
        let inner = PreimageFulfillment::new(b"world".to_vec());
        let prefix = PrefixFulfillment::new(b"hello ".to_vec(), inner.into());
        // Preimage ignores the message entirely, so any message validates;
        // this mainly exercises that prefixing doesn't panic or error.
        assert!(prefix.validate(b"", 0).is_ok());
    }
}
