//! Longest common subsequence over line sequences.
//!
//! Classic O(m·n) dynamic programming. Time and memory are both quadratic in
//! the number of lines, which is fine for editor buffers (hundreds to a few
//! thousand lines) but not for huge files. Callers should check
//! [`fits_table`] before diffing untrusted input sizes.

use serde::{Deserialize, Serialize};

/// Upper bound on DP table cells (`(m + 1) * (n + 1)`).
pub const MAX_DIFF_CELLS: usize = 16 * 1024 * 1024;

/// One matched element: `a[i] == b[j]`, both 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcsPair {
    pub i: usize,
    pub j: usize,
}

/// Whether an `m` by `n` comparison stays under [`MAX_DIFF_CELLS`].
#[must_use]
pub fn fits_table(m: usize, n: usize) -> bool {
    m.checked_add(1)
        .zip(n.checked_add(1))
        .and_then(|(rows, cols)| rows.checked_mul(cols))
        .is_some_and(|cells| cells <= MAX_DIFF_CELLS)
}

/// Compute a longest common subsequence of `a` and `b`.
///
/// Backtracking starts at `(m, n)` and takes the diagonal whenever the
/// elements are equal. Otherwise it steps toward the larger neighbour; on a
/// tie it decrements `j`, so when several alignments are equally long the
/// later elements of `a` are preferred as matches.
///
/// The returned pairs are strictly increasing in both `i` and `j`.
pub fn lcs<T: PartialEq>(a: &[T], b: &[T]) -> Vec<LcsPair> {
    let m = a.len();
    let n = b.len();
    if m == 0 || n == 0 {
        return Vec::new();
    }

    let width = n + 1;
    let mut dp = vec![0u32; (m + 1) * width];

    for i in 1..=m {
        for j in 1..=n {
            dp[i * width + j] = if a[i - 1] == b[j - 1] {
                dp[(i - 1) * width + (j - 1)] + 1
            } else {
                dp[(i - 1) * width + j].max(dp[i * width + (j - 1)])
            };
        }
    }

    let mut pairs = Vec::with_capacity(dp[m * width + n] as usize);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            pairs.push(LcsPair { i: i - 1, j: j - 1 });
            i -= 1;
            j -= 1;
        } else if dp[(i - 1) * width + j] > dp[i * width + (j - 1)] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    pairs.reverse();
    pairs
}
