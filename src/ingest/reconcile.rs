//! Merge-join of two key-sorted sequences
//!
//! Both inputs must already be sorted ascending by the join key; nothing here
//! sorts. Every index is bounds-checked, so exhausting the secondary side ends
//! the join with the remaining primary records reported as gaps.

use std::cmp::Ordering;

/// Result of a merge-join
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<'a, P, S> {
    /// Records present on both sides
    pub pairs: Vec<(&'a P, &'a S)>,
    /// Primary records with no secondary counterpart
    pub gaps: Vec<&'a P>,
    /// Secondary records skipped over without a primary partner
    pub orphans: usize,
}

impl<'a, P, S> Reconciliation<'a, P, S> {
    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }
}

/// Pair up `primary` and `secondary` by key in O(n + m).
///
/// A secondary record is consumed once paired, so a repeated primary key only
/// pairs again when the secondary side repeats it too.
pub fn reconcile<'a, P, S, K, FP, FS>(
    primary: &'a [P],
    secondary: &'a [S],
    primary_key: FP,
    secondary_key: FS,
) -> Reconciliation<'a, P, S>
where
    K: Ord,
    FP: Fn(&P) -> K,
    FS: Fn(&S) -> K,
{
    let mut pairs = Vec::new();
    let mut gaps = Vec::new();
    let mut orphans = 0;
    let mut j = 0;

    for record in primary {
        let key = primary_key(record);
        while j < secondary.len() && secondary_key(&secondary[j]) < key {
            orphans += 1;
            j += 1;
        }
        match secondary.get(j).map(|s| secondary_key(s).cmp(&key)) {
            Some(Ordering::Equal) => {
                pairs.push((record, &secondary[j]));
                j += 1;
            }
            _ => gaps.push(record),
        }
    }
    orphans += secondary.len() - j;

    Reconciliation { pairs, gaps, orphans }
}

/// Whether `items` is ascending by `key`
pub fn is_sorted_by_key<T, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> bool {
    items.windows(2).all(|w| key(&w[0]) <= key(&w[1]))
}
