#![forbid(unsafe_code)]

//! Longest increasing subsequence over the keyed-diff source array.
//!
//! # Contract
//!
//! Input is the middle-range source array of a keyed diff: `source[i]` is
//! the old-list position of the node now at new-list position `i`, or
//! `None` when that slot is a fresh mount. The result is the ascending set
//! of indices into `source` whose values form the longest strictly
//! increasing subsequence — exactly the nodes that are already in the
//! correct relative order and therefore need no physical move.
//!
//! # Guarantees
//!
//! - O(n log n) worst case (patience sorting with binary-searched tails).
//! - O(n) short-circuit when the present values are already strictly
//!   increasing — the common "nothing reordered" diff.
//! - Deterministic: ties cannot occur (old positions are unique), and
//!   replacement is by lower bound, so consecutive diffs of an unchanged
//!   list never oscillate between equivalent answers.

use smallvec::SmallVec;

/// Indices into `source` forming the longest strictly increasing
/// subsequence of the `Some` values.
#[must_use]
pub fn longest_increasing_subsequence(source: &[Option<usize>]) -> Vec<usize> {
    // Fast path: already increasing (or nothing present at all).
    if let Some(indices) = already_increasing(source) {
        return indices;
    }

    let n = source.len();
    // tails[k] = index of the smallest-valued end of an increasing
    // subsequence of length k+1; prev[i] = predecessor of i in the best
    // subsequence ending at i.
    let mut tails: SmallVec<[usize; 16]> = SmallVec::new();
    let mut prev: Vec<Option<usize>> = vec![None; n];

    for (i, slot) in source.iter().enumerate() {
        let Some(value) = *slot else {
            continue;
        };
        if let Some(&last) = tails.last() {
            // Grow when the value extends the longest tail.
            if source[last].is_some_and(|v| v < value) {
                prev[i] = Some(last);
                tails.push(i);
                continue;
            }
        } else {
            tails.push(i);
            continue;
        }
        // Lower bound: first tail whose value is >= value.
        let mut lo = 0usize;
        let mut hi = tails.len() - 1;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if source[tails[mid]].is_some_and(|v| v < value) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if source[tails[lo]].is_some_and(|v| value < v) {
            if lo > 0 {
                prev[i] = Some(tails[lo - 1]);
            }
            tails[lo] = i;
        }
    }

    // Backtrack from the last tail.
    let mut result = vec![0usize; tails.len()];
    let mut cursor = tails.last().copied();
    for slot in result.iter_mut().rev() {
        let i = cursor.expect("tail chain shorter than recorded length");
        *slot = i;
        cursor = prev[i];
    }
    result
}

/// If the present values are already strictly increasing, their indices;
/// otherwise `None`.
fn already_increasing(source: &[Option<usize>]) -> Option<Vec<usize>> {
    let mut indices = Vec::new();
    let mut last: Option<usize> = None;
    for (i, slot) in source.iter().enumerate() {
        let Some(value) = *slot else {
            continue;
        };
        if last.is_some_and(|prev| prev >= value) {
            return None;
        }
        last = Some(value);
        indices.push(i);
    }
    Some(indices)
}
