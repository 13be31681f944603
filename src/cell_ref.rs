//! Excel-style cell references and ranges.
//!
//! All coordinates here are 1-based, matching the A1 notation they
//! serialize to. `Range::clamp_to` is the single corner-clamp-and-swap
//! implementation shared by every patch site (tables, sqrefs, merges,
//! defined names).

/// Convert a 1-based column number to its letter form (1 -> "A", 27 -> "AA").
#[must_use]
pub fn col_to_letter(col: u32) -> String {
    let mut n = col.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        if let Some(ch) = char::from_u32('A' as u32 + rem) {
            letters.push(ch);
        }
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse a cell reference like "A1" or "$B$3" into 1-based (col, row).
#[must_use]
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            let upper = ch.to_ascii_uppercase();
            col = col.checked_mul(26)?.checked_add(upper as u32 - 'A' as u32 + 1)?;
            saw_col = true;
        } else if ch.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(ch as u32 - '0' as u32)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || col == 0 || row == 0 {
        return None;
    }

    Some((col, row))
}

/// A rectangular cell range with 1-based inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl Range {
    /// Parse a range like "A1:B10" or a single cell like "A1".
    #[must_use]
    pub fn parse(range: &str) -> Option<Self> {
        if let Some((start, end)) = range.split_once(':') {
            let (start_col, start_row) = parse_cell_ref(start)?;
            let (end_col, end_row) = parse_cell_ref(end)?;
            Some(Self {
                start_col,
                start_row,
                end_col,
                end_row,
            })
        } else {
            let (col, row) = parse_cell_ref(range)?;
            Some(Self {
                start_col: col,
                start_row: row,
                end_col: col,
                end_row: row,
            })
        }
    }

    /// Serialize back to A1 notation ("A1:B10", or "A1" when degenerate).
    #[must_use]
    pub fn to_a1(&self) -> String {
        let start = format!("{}{}", col_to_letter(self.start_col), self.start_row);
        if self.start_col == self.end_col && self.start_row == self.end_row {
            return start;
        }
        format!(
            "{}:{}{}",
            start,
            col_to_letter(self.end_col),
            self.end_row
        )
    }

    /// Clamp both corners into `[1, max_col] x [1, max_row]`, swapping
    /// corners afterwards if the clamp inverted the range.
    #[must_use]
    pub fn clamp_to(&self, max_col: u32, max_row: u32) -> Self {
        let clamp = |v: u32, max: u32| v.clamp(1, max.max(1));
        let mut start_col = clamp(self.start_col, max_col);
        let mut end_col = clamp(self.end_col, max_col);
        let mut start_row = clamp(self.start_row, max_row);
        let mut end_row = clamp(self.end_row, max_row);
        if start_col > end_col {
            std::mem::swap(&mut start_col, &mut end_col);
        }
        if start_row > end_row {
            std::mem::swap(&mut start_row, &mut end_row);
        }
        Self {
            start_col,
            start_row,
            end_col,
            end_row,
        }
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start_col: self.start_col.min(other.start_col),
            start_row: self.start_row.min(other.start_row),
            end_col: self.end_col.max(other.end_col),
            end_row: self.end_row.max(other.end_row),
        }
    }

    /// Number of columns spanned.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.end_col.saturating_sub(self.start_col) + 1
    }
}

/// Clamp every parseable token of a space-separated sqref list.
///
/// Tokens that fail to parse ride through unchanged; a single malformed
/// range must not block patching the rest.
#[must_use]
pub fn clamp_sqref(sqref: &str, max_col: u32, max_row: u32) -> String {
    sqref
        .split_whitespace()
        .map(|token| match Range::parse(token) {
            Some(range) => range.clamp_to(max_col, max_row).to_a1(),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
