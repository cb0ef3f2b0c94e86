//! Sorted Set
//!
//! Members are unique byte strings, each holding an `f64` score. The set is
//! stored as a plain member → score map; ordering is produced on demand by
//! materializing [`Member`]s and sorting them by `(score, name)`. Equal
//! scores therefore always come out in ascending member-name order.
//!
//! Scores are never NaN: the command layer rejects NaN before anything
//! reaches the store.

use bytes::Bytes;
use std::collections::HashMap;

/// A member projected out of a set for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: Bytes,
    pub score: f64,
}

/// A collection of uniquely named, scored members.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    members: HashMap<Bytes, f64>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a member.
    ///
    /// Returns `true` if the member is new, `false` if an existing member's
    /// score was overwritten.
    pub fn insert(&mut self, name: Bytes, score: f64) -> bool {
        self.members.insert(name, score).is_none()
    }

    pub fn score(&self, name: &[u8]) -> Option<f64> {
        self.members.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// All members in ascending `(score, name)` order.
    pub fn members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .map(|(name, &score)| Member {
                name: name.clone(),
                score,
            })
            .collect();
        members.sort_unstable_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.name.cmp(&b.name))
        });
        members
    }

    /// Member names between two inclusive ranks.
    ///
    /// Negative ranks count from the end, `-1` being the highest score.
    pub fn range(&self, start: i64, stop: i64) -> Vec<Bytes> {
        let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
            return Vec::new();
        };
        self.members()
            .into_iter()
            .skip(start)
            .take(stop - start + 1)
            .map(|member| member.name)
            .collect()
    }
}

/// Turns a possibly negative inclusive `[start, stop]` into valid indices.
///
/// A start that is still negative after adding `len` is clamped to 0 and
/// `stop` is clamped to the last index. Returns `None` when nothing remains.
fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    if len == 0 {
        return None;
    }

    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}
