#![forbid(unsafe_code)]

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use rustc_hash::FxHashSet;

use core_lts::LTS;
use core_lts::LabelIndex;
use core_lts::LabelledTransitionSystem;
use core_lts::StateIndex;

use crate::BlockIndex;
use crate::BlockPartition;
use crate::Partition;
use crate::quotient_lts_naive;
use crate::sort_topological;
use crate::tau_scc_decomposition;

/// The builder used to construct a signature before it is interned.
pub type SignatureBuilder = Vec<(LabelIndex, BlockIndex)>;

/// A signature of a state: the set of (label, block) pairs reachable by a
/// single step (for strong bisimulation) or by the appropriate silent closure
/// (for branching/weak bisimulation). Kept sorted and deduplicated so that two
/// states are in the same signature class iff their slices are equal.
#[derive(Clone, Copy, Eq)]
pub struct Signature<'a>(&'a [(LabelIndex, BlockIndex)]);

impl<'a> Signature<'a> {
    pub fn new(slice: &'a [(LabelIndex, BlockIndex)]) -> Signature<'a> {
        Signature(slice)
    }

    pub fn as_slice(&self) -> &'a [(LabelIndex, BlockIndex)] {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a (LabelIndex, BlockIndex)> {
        self.0.iter()
    }

    /// Returns true iff `self`, excluding the given pair, is a subset of `other`.
    pub fn is_subset_of(&self, other: &[(LabelIndex, BlockIndex)], exclude: (LabelIndex, BlockIndex)) -> bool {
        let mut self_iter = self.0.iter().filter(|&&pair| pair != exclude);
        let mut other_iter = other.iter();

        let mut self_item = self_iter.next();

        while let Some(item) = self_item {
            match other_iter.find(|&&o| o == *item) {
                Some(_) => self_item = self_iter.next(),
                None => return false,
            }
        }

        true
    }
}

impl Default for Signature<'_> {
    fn default() -> Self {
        Signature(&[])
    }
}

impl PartialEq for Signature<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Hash for Signature<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Debug for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Returns true iff the given label is the synthetic label used by
/// [`branching_bisim_signature_inductive`] to refer to the signature of an
/// inert tau-successor instead of an explicit pair.
fn is_tau_hat(label: LabelIndex, lts: &impl LTS) -> bool {
    label.value() == lts.num_of_labels()
}

/// Returns the signature for strong bisimulation: sig(s, pi) = { (a, pi(t)) | s -a-> t }.
pub fn strong_bisim_signature(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &impl Partition,
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    for transition in lts.outgoing_transitions(state_index) {
        builder.push((transition.label, partition.block_number(transition.to)));
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Returns the signature for branching bisimulation by explicitly exploring
/// the silent closure: sig(s, pi) = { (a, pi(t)) | s -tau->* s' -a-> t, pi(s) = pi(s'), (a != tau || pi(s) != pi(t)) }.
///
/// This is the reference implementation used to validate the faster
/// [`branching_bisim_signature_sorted`] and [`branching_bisim_signature_inductive`] variants.
pub fn branching_bisim_signature(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &impl Partition,
    builder: &mut SignatureBuilder,
    visited: &mut FxHashSet<StateIndex>,
    stack: &mut Vec<StateIndex>,
) {
    builder.clear();
    visited.clear();

    debug_assert!(stack.is_empty(), "The stack should be empty");
    stack.push(state_index);
    visited.insert(state_index);

    while let Some(inner_state_index) = stack.pop() {
        for transition in lts.outgoing_transitions(inner_state_index) {
            if lts.is_hidden_label(transition.label) && partition.block_number(state_index) == partition.block_number(transition.to) {
                if visited.insert(transition.to) {
                    stack.push(transition.to);
                }
            } else {
                builder.push((transition.label, partition.block_number(transition.to)));
            }
        }
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Branching bisimulation signature that assumes the input has no tau-cycles
/// and that states are processed in an order where inert tau-successors have
/// already had their signature computed (see [`preprocess_branching`]).
pub fn branching_bisim_signature_sorted(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &impl Partition,
    state_to_signature: &[Signature],
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    for transition in lts.outgoing_transitions(state_index) {
        let to_block = partition.block_number(transition.to);

        if partition.block_number(state_index) == to_block && lts.is_hidden_label(transition.label) {
            builder.extend(state_to_signature[transition.to].as_slice());
        } else {
            builder.push((transition.label, to_block));
        }
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Variant of [`branching_bisim_signature_sorted`] for weak bisimulation,
/// which additionally has to take the silent closure of visible actions.
pub fn weak_bisim_signature_sorted(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &impl Partition,
    state_to_signature: &[Signature],
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    for transition in lts.outgoing_transitions(state_index) {
        let to_block = partition.block_number(transition.to);

        if partition.block_number(state_index) == to_block && lts.is_hidden_label(transition.label) {
            builder.extend(state_to_signature[transition.to].as_slice());
        } else {
            builder.push((transition.label, to_block));

            if lts.is_hidden_label(transition.label) {
                // Also include whatever the tau-successor can reach, since weak
                // bisimulation allows arbitrary tau before and after the action.
                builder.extend(state_to_signature[transition.to].as_slice());
            }
        }
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Computes the signature restricted to the tau-successors only, used as a
/// pre-pass to fill in `state_to_signature` for [`weak_bisim_signature_sorted`]
/// before the actual per-state signature of this iteration is computed.
pub fn weak_bisim_signature_sorted_taus(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &impl Partition,
    state_to_signature: &[Signature],
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    for transition in lts.outgoing_transitions(state_index) {
        if lts.is_hidden_label(transition.label) {
            builder.extend(state_to_signature[transition.to].as_slice());
        } else {
            builder.push((transition.label, partition.block_number(transition.to)));
        }
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Branching bisimulation signature for the block-partition refinement, using
/// a synthetic label (one past the last real label) to refer to the key of an
/// inert tau-successor in the *next* partition instead of inlining it, which
/// allows [`crate::signature_refinement`]'s renumbering step to detect that a
/// state's signature is subsumed by that of its tau-successor.
pub fn branching_bisim_signature_inductive(
    state_index: StateIndex,
    lts: &impl LTS,
    partition: &BlockPartition,
    state_to_key: &[BlockIndex],
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    let tau_hat = LabelIndex::new(lts.num_of_labels());

    for transition in lts.outgoing_transitions(state_index) {
        let to_block = partition.block_number(transition.to);

        if partition.block_number(state_index) == to_block && lts.is_hidden_label(transition.label) && partition.is_element_marked(transition.to) {
            builder.push((tau_hat, state_to_key[transition.to]));
        } else {
            builder.push((transition.label, to_block));
        }
    }

    builder.sort_unstable();
    builder.dedup();
}

/// Preprocesses an LTS for branching (or weak) bisimulation signature
/// refinement: tau-cycles are removed by quotienting strongly connected
/// tau-components, and the resulting acyclic LTS is reordered so that every
/// inert tau-successor of a state has a smaller state index, which is the
/// order the sorted signature functions above rely on.
pub fn preprocess_branching<L: LTS>(lts: L) -> LabelledTransitionSystem<L::Label> {
    let scc_partition = tau_scc_decomposition(&lts);
    let quotient = quotient_lts_naive(&lts, &scc_partition, true);

    let permutation = sort_topological(&quotient, |label_index, _| quotient.is_hidden_label(label_index), true)
        .expect("Quotienting the tau strongly connected components leaves no tau-cycles");

    LabelledTransitionSystem::new_from_permutation(quotient, move |i| permutation[i])
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use core_lts::random_lts;
    use core_utilities::random_test;

    use super::*;
    use crate::IndexedPartition;
    use crate::has_tau_loop;

    #[test]
    fn test_random_preprocess_branching_has_no_tau_loop() {
        random_test(100, |rng| {
            let lts = random_lts(rng, 10, 3, 3);
            let preprocessed = preprocess_branching(lts);
            assert!(!has_tau_loop(&preprocessed));
        });
    }

    #[test]
    fn test_strong_bisim_signature_is_sorted_and_deduped() {
        let lts = random_lts(&mut rand::rng(), 6, 2, 2);
        let partition = IndexedPartition::new(lts.num_of_states());
        let mut builder = SignatureBuilder::default();

        for state_index in lts.iter_states() {
            strong_bisim_signature(state_index, &lts, &partition, &mut builder);

            let mut sorted = builder.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(builder, sorted);
        }
    }

    #[test]
    fn test_signature_is_subset_of() {
        let a = [(LabelIndex::new(0), BlockIndex::new(0)), (LabelIndex::new(1), BlockIndex::new(2))];
        let b = [
            (LabelIndex::new(0), BlockIndex::new(0)),
            (LabelIndex::new(1), BlockIndex::new(2)),
            (LabelIndex::new(3), BlockIndex::new(4)),
        ];

        let signature = Signature::new(&a);
        assert!(signature.is_subset_of(&b, (LabelIndex::new(9), BlockIndex::new(9))));
        assert!(!signature.is_subset_of(&a[..1], (LabelIndex::new(9), BlockIndex::new(9))));
    }
}
