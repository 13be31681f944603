//! Header text canonicalization and string similarity.
//!
//! `normalize` reduces a header label to a canonical comparison key:
//! lowercased, locale suffix removed, separator punctuation collapsed to
//! single spaces, everything outside `[0-9a-z ]` dropped. The function is
//! idempotent, so keys can be re-normalized freely.

use std::collections::HashMap;

/// Canonicalize a header label for comparison.
#[must_use]
pub fn normalize(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = strip_locale_suffix(&lower);

    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        // Unify dash variants before the separator collapse.
        let ch = match ch {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            c => c,
        };
        let mapped = match ch {
            '.' | '_' | '/' | '\\' | '-' => ' ',
            c if c.is_ascii_digit() || c.is_ascii_lowercase() => c,
            _ => ' ',
        };
        out.push(mapped);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip a trailing " - en-US" style locale suffix (any of `-`, `_` or a
/// space between "en" and "us", arbitrary surrounding whitespace).
///
/// Expects already-lowercased input. Returns the input unchanged when the
/// suffix is absent.
fn strip_locale_suffix(s: &str) -> &str {
    try_strip_locale(s).unwrap_or(s)
}

fn try_strip_locale(s: &str) -> Option<&str> {
    let t = s.trim_end();
    let t = t.strip_suffix("us")?;
    let ws_trimmed = t.trim_end();
    let t = if let Some(rest) = ws_trimmed.strip_suffix(['-', '_']) {
        rest
    } else if ws_trimmed.len() < t.len() {
        // A bare space separated "en" from "us" and was eaten by the trim.
        ws_trimmed
    } else {
        return None;
    };
    let t = t.trim_end();
    let t = t.strip_suffix("en")?;
    let t = t.trim_end();
    t.strip_suffix('-')
}

/// Similarity ratio between two strings in `[0.0, 1.0]`.
///
/// Computed as `2 * M / T` where `M` is the total size of the longest
/// matching blocks and `T` the combined length, the same scoring the
/// original mapping tool used for fuzzy suggestions. Two empty strings
/// score `1.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_size(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Sum of the longest matching block sizes between `a` and `b`.
fn matching_size(a: &[char], b: &[char]) -> usize {
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    let mut total = 0usize;

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k > 0 {
            total += k;
            queue.push((alo, i, blo, j));
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest block of equal characters within `a[alo..ahi]` / `b[blo..bhi]`.
///
/// Returns `(a_start, b_start, length)`; ties resolve to the earliest
/// block in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, ca) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_j2len = HashMap::new();
        for (j, cb) in b.iter().enumerate().take(bhi).skip(blo) {
            if ca != cb {
                continue;
            }
            let run = if j > blo {
                j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
            } else {
                1
            };
            next_j2len.insert(j, run);
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        j2len = next_j2len;
    }

    best
}
