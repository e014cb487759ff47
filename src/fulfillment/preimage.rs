//! Preimage-SHA-256 (type 0): spec.md §4.4. The simplest fulfillment —
//! reveal bytes whose SHA-256 the condition committed to.

use std::io::Write;

use crate::condition::{FEATURE_PREIMAGE, FEATURE_SHA_256, TYPE_PREIMAGE};
use crate::error::ConditionResult;
use crate::fulfillment::FulfillmentPayload;
use crate::oer::{OerWriter, Predictor, Reader};

/// A revealed preimage. Satisfies its condition for any message (the
/// message is ignored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageFulfillment {
    preimage: Vec<u8>,
}

impl PreimageFulfillment {
    /// Wrap `preimage` as a fulfillment.
    pub fn new(preimage: Vec<u8>) -> Self {
        Self { preimage }
    }

    /// The preimage bytes.
    pub fn preimage(&self) -> &[u8] {
        &self.preimage
    }
}

impl FulfillmentPayload for PreimageFulfillment {
    const TYPE_ID: u16 = TYPE_PREIMAGE;

    fn feature_bitmask(&self) -> u32 {
        FEATURE_PREIMAGE | FEATURE_SHA_256
    }

    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        // No length prefix: the preimage bytes verbatim.
        writer.write_all(&self.preimage)?;
        Ok(())
    }

    fn write_payload<W: OerWriter>(&self, writer: &mut W, _depth: usize) -> ConditionResult<()> {
        // No length prefix, same as the hash payload: a fulfillment's
        // binary form is `type_id | payload_bytes` with nothing else, and
        // at the top level the payload runs to the end of the buffer.
        writer.write_all(&self.preimage)?;
        Ok(())
    }

    fn parse_payload(reader: &mut Reader, _depth: usize) -> ConditionResult<Self> {
        Ok(Self::new(reader.read_octet_string(reader.remaining())?))
    }

    fn calculate_max_fulfillment_length(&self, _depth: usize) -> ConditionResult<u64> {
        let mut predictor = Predictor::new();
        predictor.write_all(&self.preimage)?;
        Ok(predictor.len() as u64)
    }

    fn validate(&self, _message: &[u8], _depth: usize) -> ConditionResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fulfillment::{Fulfillment, FulfillmentPayload};

    #[test]
    fn empty_preimage_matches_known_condition() {
        let f = PreimageFulfillment::new(vec![]);
        let condition = f.get_condition(0).unwrap();
        assert_eq!(
            condition.serialize_uri(),
            "cc:0:3:47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU:0"
        );
    }

    #[test]
    fn validate_ignores_the_message() {
        let f = PreimageFulfillment::new(b"secret".to_vec());
        assert!(f.validate(b"anything", 0).is_ok());
        assert!(f.validate(b"", 0).is_ok());
    }

    #[test]
    fn max_fulfillment_length_matches_payload_size() {
        // Unframed: the fulfillment payload is the preimage bytes verbatim.
        let f = PreimageFulfillment::new(vec![0u8; 200]);
        assert_eq!(f.calculate_max_fulfillment_length(0).unwrap(), 200);
    }

    #[test]
    fn empty_preimage_fulfillment_uri_is_exactly_cf_0() {
        let f = PreimageFulfillment::new(vec![]);
        assert_eq!(f.calculate_max_fulfillment_length(0).unwrap(), 0);
        assert_eq!(Fulfillment::from(f).serialize_uri(), "cf:0:");
    }
}
