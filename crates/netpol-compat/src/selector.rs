//! Exact-match selector overlap.

use serde::{Deserialize, Serialize};

use crate::model::{LabelMap, LabelPair};

/// Outcome of an overlap test between two label maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub matched: bool,
    /// A label present with the same value in both maps. `Some` iff `matched`.
    pub witness: Option<LabelPair>,
}

/// A peer selector that overlaps a subject selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMatch {
    /// Position of the peer among the qualifying peers.
    pub index: usize,
    pub witness: LabelPair,
}

/// Tests whether `a` and `b` share a key with an equal value.
pub fn has_overlap(a: &LabelMap, b: &LabelMap) -> Overlap {
    let witness = find_overlap(a, b);
    Overlap {
        matched: witness.is_some(),
        witness,
    }
}

/// Returns the lexicographically smallest key shared by `a` and `b` with
/// an equal value.
pub fn find_overlap(a: &LabelMap, b: &LabelMap) -> Option<LabelPair> {
    // Both maps iterate in key order, so walking the smaller one still
    // yields the smallest shared key first.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .find(|(key, value)| large.get(*key) == Some(*value))
        .map(|(key, value)| LabelPair::new(key, value))
}

/// Tests each peer selector against `subject` and returns the first peer,
/// in declaration order, that overlaps it.
pub fn first_matching_peer(peers: &[LabelMap], subject: &LabelMap) -> Option<PeerMatch> {
    peers.iter().enumerate().find_map(|(index, labels)| {
        find_overlap(labels, subject).map(|witness| PeerMatch { index, witness })
    })
}
