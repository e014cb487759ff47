//! Threshold-SHA-256 (type 2): spec.md §4.6. A weighted M-of-N composite
//! over subconditions, some of which may be concretely fulfilled.
//!
//! The canonical member ordering and the optimal subfulfillment-selection
//! search are both specific to this type; nothing in `coins-core` has an
//! analogous composite-with-selection structure; the shape of the
//! recursive OER read/write otherwise follows [`super::prefix`].

use std::collections::HashSet;

use crate::condition::{Condition, FEATURE_SHA_256, FEATURE_THRESHOLD, TYPE_THRESHOLD};
use crate::error::{ConditionError, ConditionResult};
use crate::fulfillment::{check_depth, Fulfillment, FulfillmentPayload};
use crate::oer::{OerWriter, Predictor, Reader};

/// One weighted slot in a threshold composite: either a concrete
/// subfulfillment, or a bare subcondition the caller does not currently
/// hold a fulfillment for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdMember {
    /// A weighted member with a known fulfillment.
    Fulfillment {
        /// This member's contribution toward the threshold when selected.
        weight: u64,
        /// The subfulfillment.
        fulfillment: Box<Fulfillment>,
    },
    /// A weighted member known only by its condition.
    Condition {
        /// This member's contribution toward the threshold (irrelevant,
        /// since a bare condition can never be selected as fulfilled).
        weight: u64,
        /// The subcondition.
        condition: Condition,
    },
}

impl ThresholdMember {
    /// Wrap a known subfulfillment.
    pub fn fulfilled(weight: u64, fulfillment: Fulfillment) -> Self {
        ThresholdMember::Fulfillment {
            weight,
            fulfillment: Box::new(fulfillment),
        }
    }

    /// Wrap a bare subcondition.
    pub fn unfulfilled(weight: u64, condition: Condition) -> Self {
        ThresholdMember::Condition { weight, condition }
    }

    fn weight(&self) -> u64 {
        match self {
            ThresholdMember::Fulfillment { weight, .. } => *weight,
            ThresholdMember::Condition { weight, .. } => *weight,
        }
    }

    fn feature_bitmask(&self) -> u32 {
        match self {
            ThresholdMember::Fulfillment { fulfillment, .. } => fulfillment.feature_bitmask(),
            ThresholdMember::Condition { condition, .. } => condition.feature_bitmask(),
        }
    }

    fn condition_at_depth(&self, depth: usize) -> ConditionResult<Condition> {
        match self {
            ThresholdMember::Fulfillment { fulfillment, .. } => fulfillment.get_condition_at_depth(depth),
            ThresholdMember::Condition { condition, .. } => Ok(condition.clone()),
        }
    }
}

/// A weighted M-of-N composite: `threshold` worth of weighted members must
/// be both present and individually valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdFulfillment {
    threshold: u64,
    members: Vec<ThresholdMember>,
}

/// A member together with the condition it resolves to, in the order
/// members were given — the sort into canonical order happens separately
/// so callers can still map back to the original member.
struct ResolvedMember<'a> {
    weight: u64,
    condition: Condition,
    member: &'a ThresholdMember,
}

impl ThresholdFulfillment {
    /// Build a threshold fulfillment from its members. Member order is not
    /// significant; canonical order is derived fresh whenever needed.
    pub fn new(threshold: u64, members: Vec<ThresholdMember>) -> Self {
        Self { threshold, members }
    }

    /// The required weight sum.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// The members, in the order they were constructed or parsed.
    pub fn members(&self) -> &[ThresholdMember] {
        &self.members
    }

    /// Resolve every member's condition at `depth` and sort by the
    /// lexicographic byte order of `VarUInt(weight) | Condition.binary`,
    /// per spec.md §4.6. This ordering is independent of insertion order.
    fn canonical_members(&self, depth: usize) -> ConditionResult<Vec<ResolvedMember<'_>>> {
        let mut keyed = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let weight = member.weight();
            let condition = member.condition_at_depth(depth)?;
            let mut key = Vec::new();
            key.write_var_uint(weight)?;
            condition.write_binary(&mut key)?;
            keyed.push((
                key,
                ResolvedMember {
                    weight,
                    condition,
                    member,
                },
            ));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, m)| m).collect())
    }
}

impl FulfillmentPayload for ThresholdFulfillment {
    const TYPE_ID: u16 = TYPE_THRESHOLD;

    fn feature_bitmask(&self) -> u32 {
        self.members
            .iter()
            .fold(FEATURE_THRESHOLD | FEATURE_SHA_256, |acc, m| {
                acc | m.feature_bitmask()
            })
    }

    fn write_hash_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        let members = self.canonical_members(depth + 1)?;
        writer.write_var_uint(self.threshold)?;
        writer.write_var_uint(members.len() as u64)?;
        for m in &members {
            writer.write_var_uint(m.weight)?;
            m.condition.write_binary(writer)?;
        }
        Ok(())
    }

    fn write_payload<W: OerWriter>(&self, writer: &mut W, depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        let members = self.canonical_members(depth + 1)?;

        let mut condition_binary = Vec::with_capacity(members.len());
        for m in &members {
            condition_binary.push(m.condition.to_binary()?);
        }

        // Candidates: positions of fulfillable members, their weight, and
        // how much longer their fulfillment bytes are than their
        // condition bytes would have been.
        let mut candidates = Vec::new();
        for (i, m) in members.iter().enumerate() {
            if let ThresholdMember::Fulfillment { fulfillment, .. } = m.member {
                let fulfillment_binary = fulfillment.to_binary_at_depth(depth + 1)?;
                let delta = fulfillment_binary.len() as i64 - condition_binary[i].len() as i64;
                candidates.push((i, m.weight, delta));
            }
        }

        log::trace!(
            "searching {} candidate subfulfillments for a covering of threshold {}",
            candidates.len(),
            self.threshold
        );
        let selection = select_minimum_cost_covering(&candidates, self.threshold).ok_or_else(|| {
            let available: u64 = candidates.iter().map(|&(_, w, _)| w).sum();
            log::debug!(
                "no covering of threshold {} found; available weight {}",
                self.threshold,
                available
            );
            ConditionError::ThresholdNotMet {
                needed: self.threshold,
                have: available,
            }
        })?;
        let selected: HashSet<usize> = selection.into_iter().collect();

        writer.write_var_uint(self.threshold)?;
        writer.write_var_uint(members.len() as u64)?;
        for (i, m) in members.iter().enumerate() {
            writer.write_var_uint(m.weight)?;
            if selected.contains(&i) {
                writer.write_all(&[0x01])?;
                match m.member {
                    ThresholdMember::Fulfillment { fulfillment, .. } => {
                        let bytes = fulfillment.to_binary_at_depth(depth + 1)?;
                        writer.write_var_octet_string(&bytes)?;
                    }
                    ThresholdMember::Condition { .. } => unreachable!("selection only picks fulfillable members"),
                }
            } else {
                writer.write_all(&[0x00])?;
                writer.write_var_octet_string(&m.condition.to_binary()?)?;
            }
        }
        Ok(())
    }

    fn parse_payload(reader: &mut Reader, depth: usize) -> ConditionResult<Self> {
        check_depth(depth)?;
        let threshold = reader.read_var_uint()?;
        let count = reader.read_var_uint()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let weight = reader.read_var_uint()?;
            let tag = reader.read_octet_string(1)?[0];
            let wrapped = reader.read_var_octet_string()?;
            match tag {
                0x01 => {
                    let fulfillment = Fulfillment::from_binary_at_depth(&wrapped, depth + 1)?;
                    members.push(ThresholdMember::fulfilled(weight, fulfillment));
                }
                0x00 => {
                    let condition = Condition::from_binary(&wrapped)?;
                    members.push(ThresholdMember::unfulfilled(weight, condition));
                }
                other => {
                    return Err(ConditionError::ParseError(format!(
                        "invalid threshold member tag byte: {}",
                        other
                    )))
                }
            }
        }
        Ok(Self::new(threshold, members))
    }

    fn calculate_max_fulfillment_length(&self, depth: usize) -> ConditionResult<u64> {
        check_depth(depth)?;
        let members = self.canonical_members(depth + 1)?;

        // For each member, the worst case when it is the chosen
        // fulfillment is its subcondition's own committed fulfillment
        // bound; the worst case when it is left as a bare condition is the
        // condition's own binary length. Matching `PrefixFulfillment`'s
        // analogous formula, the embedded type id is not counted a second
        // time here (see DESIGN.md).
        let mut per_member = Vec::with_capacity(members.len());
        for m in &members {
            let max_subfulfillment_length = m.condition.max_fulfillment_length();
            let max_subcondition_length = m.condition.to_binary()?.len() as u64;
            per_member.push((m.weight, max_subfulfillment_length, max_subcondition_length));
        }

        // spec.md §4.6: sort ascending by (subfulfillment - subcondition)
        // length and greedily take the cheapest members until the
        // threshold's weight is covered. This mirrors, but is simpler
        // than, the branch-and-bound search `write_payload` performs,
        // because it only needs to match the *worst case*, not produce an
        // actual encoding.
        let mut order: Vec<usize> = (0..per_member.len()).collect();
        order.sort_by_key(|&i| {
            let (_, max_f, max_c) = per_member[i];
            max_f as i64 - max_c as i64
        });

        let mut selected = vec![false; per_member.len()];
        let mut acc_weight = 0u64;
        for &i in &order {
            if acc_weight >= self.threshold {
                break;
            }
            selected[i] = true;
            acc_weight += per_member[i].0;
        }
        if acc_weight < self.threshold {
            return Err(ConditionError::ThresholdNotMet {
                needed: self.threshold,
                have: acc_weight,
            });
        }

        let mut predictor = Predictor::new();
        predictor.write_var_uint(self.threshold)?;
        predictor.write_var_uint(per_member.len() as u64)?;
        let mut total = predictor.len() as u64;
        for (i, (weight, max_f, max_c)) in per_member.iter().enumerate() {
            let mut weight_predictor = Predictor::new();
            weight_predictor.write_var_uint(*weight)?;
            total += weight_predictor.len() as u64;
            total += 1; // tag byte
            let content_len = if selected[i] { *max_f } else { *max_c };
            total += var_octet_string_framing_len(content_len) + content_len;
        }
        Ok(total)
    }

    fn validate(&self, message: &[u8], depth: usize) -> ConditionResult<()> {
        check_depth(depth)?;
        let mut fulfilled_weight = 0u64;
        for member in &self.members {
            if let ThresholdMember::Fulfillment { weight, fulfillment } = member {
                fulfillment.validate_at_depth(message, depth + 1)?;
                fulfilled_weight += *weight;
            }
        }
        if fulfilled_weight < self.threshold {
            return Err(ConditionError::ThresholdNotMet {
                needed: self.threshold,
                have: fulfilled_weight,
            });
        }
        Ok(())
    }
}

/// The number of bytes `write_var_octet_string` spends on the length prefix
/// alone for a payload of `len` bytes: one byte in the short form (`len <
/// 128`), or one marker byte plus the minimal big-endian encoding of `len`
/// in the long form.
fn var_octet_string_framing_len(len: u64) -> u64 {
    if len < 0x80 {
        1
    } else {
        1 + ((64 - len.leading_zeros() as u64 + 7) / 8)
    }
}

/// Search for the subset of `candidates` (each `(position, weight,
/// delta)`) whose weights sum to at least `threshold`, minimizing the
/// summed `delta`. Branch-and-bound over inclusion/exclusion of each
/// candidate, pruned by the remaining achievable weight and an optimistic
/// lower bound on remaining cost.
fn select_minimum_cost_covering(candidates: &[(usize, u64, i64)], threshold: u64) -> Option<Vec<usize>> {
    let n = candidates.len();
    let mut suffix_weight = vec![0u64; n + 1];
    let mut suffix_min_delta = vec![0i64; n + 1];
    for i in (0..n).rev() {
        suffix_weight[i] = suffix_weight[i + 1] + candidates[i].1;
        suffix_min_delta[i] = suffix_min_delta[i + 1] + candidates[i].2.min(0);
    }

    let mut best: Option<(i64, Vec<usize>)> = None;
    let mut chosen = Vec::new();
    search(
        candidates,
        &suffix_weight,
        &suffix_min_delta,
        threshold,
        0,
        0,
        0,
        &mut chosen,
        &mut best,
    );
    best.map(|(_, indices)| indices)
}

#[allow(clippy::too_many_arguments)]
fn search(
    candidates: &[(usize, u64, i64)],
    suffix_weight: &[u64],
    suffix_min_delta: &[i64],
    threshold: u64,
    i: usize,
    acc_weight: u64,
    acc_cost: i64,
    chosen: &mut Vec<usize>,
    best: &mut Option<(i64, Vec<usize>)>,
) {
    if let Some((best_cost, _)) = best {
        if acc_cost + suffix_min_delta[i] >= *best_cost {
            return;
        }
    }
    if acc_weight >= threshold && best.as_ref().map_or(true, |(c, _)| acc_cost < *c) {
        *best = Some((acc_cost, chosen.iter().map(|&idx| candidates[idx].0).collect()));
    }
    if i == candidates.len() {
        return;
    }
    if acc_weight + suffix_weight[i] < threshold {
        return;
    }

    chosen.push(i);
    search(
        candidates,
        suffix_weight,
        suffix_min_delta,
        threshold,
        i + 1,
        acc_weight + candidates[i].1,
        acc_cost + candidates[i].2,
        chosen,
        best,
    );
    chosen.pop();

    search(
        candidates,
        suffix_weight,
        suffix_min_delta,
        threshold,
        i + 1,
        acc_weight,
        acc_cost,
        chosen,
        best,
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fulfillment::PreimageFulfillment;

    #[test]
    fn threshold_one_of_two_matches_known_condition() {
        // 1-of-2 threshold over two preimage fulfillments "a" and "b",
        // only "a" attached.
        let a = PreimageFulfillment::new(b"a".to_vec());
        let b_condition = PreimageFulfillment::new(b"b".to_vec()).get_condition(0).unwrap();

        let threshold = ThresholdFulfillment::new(
            1,
            vec![
                ThresholdMember::fulfilled(1, a.into()),
                ThresholdMember::unfulfilled(1, b_condition),
            ],
        );
        assert!(threshold.validate(b"", 0).is_ok());
        let condition = threshold.get_condition(0).unwrap();
        assert_eq!(condition.type_id(), TYPE_THRESHOLD);
    }

    #[test]
    fn validate_fails_when_threshold_not_met() {
        let a_condition = PreimageFulfillment::new(b"a".to_vec()).get_condition(0).unwrap();
        let b_condition = PreimageFulfillment::new(b"b".to_vec()).get_condition(0).unwrap();
        let threshold = ThresholdFulfillment::new(
            2,
            vec![
                ThresholdMember::unfulfilled(1, a_condition),
                ThresholdMember::unfulfilled(1, b_condition),
            ],
        );
        assert!(matches!(
            threshold.validate(b"", 0),
            Err(ConditionError::ThresholdNotMet { .. })
        ));
    }

    #[test]
    fn binary_round_trips_with_a_mix_of_members() {
        let a = PreimageFulfillment::new(b"a".to_vec());
        let b_condition = PreimageFulfillment::new(b"b".to_vec()).get_condition(0).unwrap();
        let threshold = ThresholdFulfillment::new(
            1,
            vec![
                ThresholdMember::fulfilled(1, a.into()),
                ThresholdMember::unfulfilled(1, b_condition),
            ],
        );
        let fulfillment: Fulfillment = threshold.into();
        let binary = fulfillment.to_binary().unwrap();
        let parsed = Fulfillment::from_binary(&binary).unwrap();
        assert_eq!(fulfillment.get_condition().unwrap(), parsed.get_condition().unwrap());
    }

    #[test]
    fn selection_prefers_the_cheaper_covering_set() {
        // Three fulfillable candidates, any single one meets the
        // threshold; the search should pick the cheapest.
        let candidates = vec![(0, 1u64, 10i64), (1, 1u64, 1i64), (2, 1u64, 5i64)];
        let selection = select_minimum_cost_covering(&candidates, 1).unwrap();
        assert_eq!(selection, vec![1]);
    }
}
