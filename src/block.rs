//! Value block construction.
//!
//! Materializes the column resolution and source data into a dense,
//! row-major block of sanitized text values sized to the template's
//! used-column count. Built once per run and consumed exactly once by
//! the structural patcher.

use crate::resolve::{MappingReport, Resolution, SourceTable};

/// Limits for the used-column header scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Stop once this many consecutive empty header cells follow the last
    /// non-empty one.
    pub empty_streak_stop: usize,
    /// Absolute ceiling on scanned columns.
    pub hard_cap: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            empty_streak_stop: 8,
            hard_cap: 2048,
        }
    }
}

/// Dense row-major block of text values. Empty string = empty cell.
#[derive(Debug, Clone)]
pub struct ValueBlock {
    n_rows: usize,
    n_cols: usize,
    cells: Vec<String>,
}

impl ValueBlock {
    fn empty(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            cells: vec![String::new(); n_rows * n_cols],
        }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Cell value at 0-based (row, col); empty string when out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> &str {
        if col >= self.n_cols {
            return "";
        }
        self.cells
            .get(row * self.n_cols + col)
            .map_or("", String::as_str)
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if col >= self.n_cols {
            return;
        }
        if let Some(cell) = self.cells.get_mut(row * self.n_cols + col) {
            *cell = value;
        }
    }
}

/// Build the value block for `n_rows` data rows and `n_cols` template columns.
///
/// Resolved columns copy the source column's values (trimmed, `nan`/`none`
/// scrubbed, XML-sanitized); constant-fill columns repeat their literal;
/// unmatched columns and rows past the source's length stay empty.
#[must_use]
pub fn build_block(
    n_rows: usize,
    n_cols: usize,
    report: &MappingReport,
    source: &SourceTable,
) -> ValueBlock {
    let mut block = ValueBlock::empty(n_rows, n_cols);

    for entry in &report.columns {
        if entry.column == 0 || entry.column > n_cols {
            continue;
        }
        let col = entry.column - 1;

        match &entry.resolution {
            Resolution::ConstantFill { value } => {
                for row in 0..n_rows {
                    block.set(row, col, value.clone());
                }
            }
            Resolution::Resolved { source_col, .. } => {
                let Some(values) = source.columns.get(*source_col) else {
                    continue;
                };
                for (row, raw) in values.iter().take(n_rows).enumerate() {
                    let trimmed = raw.trim();
                    if trimmed.is_empty() || is_null_text(trimmed) {
                        continue;
                    }
                    block.set(row, col, sanitize_xml_text(trimmed));
                }
            }
            Resolution::Unmatched { .. } => {}
        }
    }

    block
}

/// Placeholder strings that mean "no value" in exported tabular data.
fn is_null_text(value: &str) -> bool {
    value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("none")
}

/// Drop characters that are illegal in XML 1.0 text content.
///
/// Removes the C0 control ranges (keeping tab, LF and CR). Unpaired
/// surrogates cannot occur in a Rust `String`, so only the control ranges
/// need filtering.
#[must_use]
pub fn sanitize_xml_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}'))
        .collect()
}

/// Detect the template's used-column count from its header row(s).
///
/// Scans left-to-right and stops once `empty_streak_stop` consecutive
/// all-empty header cells follow the last non-empty one, capped at
/// `hard_cap`. Always reports at least one column.
#[must_use]
pub fn used_column_count(header_rows: &[&[String]], limits: ScanLimits) -> usize {
    let widest = header_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let max_try = widest.min(limits.hard_cap);

    let mut last_nonempty = 0usize;
    let mut streak = 0usize;
    for col in 0..max_try {
        let any_value = header_rows
            .iter()
            .any(|row| row.get(col).is_some_and(|v| !v.trim().is_empty()));
        if any_value {
            last_nonempty = col + 1;
            streak = 0;
        } else {
            streak += 1;
            if streak >= limits.empty_streak_stop {
                break;
            }
        }
    }

    last_nonempty.max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resolve::{ColumnReport, MappingReport, Resolution, SourceTable};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn report_with(columns: Vec<ColumnReport>) -> MappingReport {
        MappingReport { columns }
    }

    #[test]
    fn test_resolved_column_copies_and_scrubs() {
        let source = SourceTable {
            headers: strings(&["SKU"]),
            columns: vec![strings(&[" SKU1 ", "nan", "None", "", "SKU5"])],
        };
        let report = report_with(vec![ColumnReport {
            column: 1,
            label: "Partner SKU".to_string(),
            resolution: Resolution::Resolved {
                source_col: 0,
                alias: "SKU".to_string(),
            },
        }]);

        let block = build_block(5, 3, &report, &source);
        assert_eq!(block.get(0, 0), "SKU1");
        assert_eq!(block.get(1, 0), "");
        assert_eq!(block.get(2, 0), "");
        assert_eq!(block.get(3, 0), "");
        assert_eq!(block.get(4, 0), "SKU5");
        // Unmapped columns stay empty.
        assert_eq!(block.get(0, 1), "");
    }

    #[test]
    fn test_constant_fill_covers_every_row() {
        let source = SourceTable::default();
        let report = report_with(vec![ColumnReport {
            column: 2,
            label: "Listing Action (List or Unlist)".to_string(),
            resolution: Resolution::ConstantFill {
                value: "List".to_string(),
            },
        }]);

        let block = build_block(3, 2, &report, &source);
        for row in 0..3 {
            assert_eq!(block.get(row, 1), "List");
        }
    }

    #[test]
    fn test_rows_past_source_length_stay_empty() {
        let source = SourceTable {
            headers: strings(&["A"]),
            columns: vec![strings(&["x"])],
        };
        let report = report_with(vec![ColumnReport {
            column: 1,
            label: "A".to_string(),
            resolution: Resolution::Resolved {
                source_col: 0,
                alias: "A".to_string(),
            },
        }]);

        let block = build_block(3, 1, &report, &source);
        assert_eq!(block.get(0, 0), "x");
        assert_eq!(block.get(1, 0), "");
        assert_eq!(block.get(2, 0), "");
    }

    #[test]
    fn test_column_past_block_width_is_ignored() {
        let source = SourceTable {
            headers: strings(&["A"]),
            columns: vec![strings(&["x"])],
        };
        let report = report_with(vec![ColumnReport {
            column: 9,
            label: "A".to_string(),
            resolution: Resolution::Resolved {
                source_col: 0,
                alias: "A".to_string(),
            },
        }]);
        let block = build_block(1, 2, &report, &source);
        assert_eq!(block.get(0, 0), "");
        assert_eq!(block.get(0, 1), "");
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_xml_text("a\u{01}b\u{0B}c"), "abc");
        assert_eq!(sanitize_xml_text("tab\tok\nline\r"), "tab\tok\nline\r");
        assert_eq!(sanitize_xml_text("clean"), "clean");
    }

    #[test]
    fn test_used_column_count_streak_stop() {
        // 3 headers, then a gap longer than the streak limit, then more.
        let mut headers = strings(&["A", "B", "C"]);
        headers.extend(vec![String::new(); 8]);
        headers.push("far".to_string());
        let rows: [&[String]; 1] = [headers.as_slice()];
        assert_eq!(
            used_column_count(&rows, ScanLimits::default()),
            3,
            "scan stops before the far column"
        );
    }

    #[test]
    fn test_used_column_count_short_gap_is_bridged() {
        let mut headers = strings(&["A"]);
        headers.extend(vec![String::new(); 3]);
        headers.push("E".to_string());
        let rows: [&[String]; 1] = [headers.as_slice()];
        assert_eq!(used_column_count(&rows, ScanLimits::default()), 5);
    }

    #[test]
    fn test_used_column_count_minimum_one() {
        let headers: Vec<String> = Vec::new();
        let rows: [&[String]; 1] = [headers.as_slice()];
        assert_eq!(used_column_count(&rows, ScanLimits::default()), 1);
    }

    #[test]
    fn test_used_column_count_hard_cap() {
        let headers = vec!["h".to_string(); 100];
        let rows: [&[String]; 1] = [headers.as_slice()];
        let limits = ScanLimits {
            empty_streak_stop: 8,
            hard_cap: 10,
        };
        assert_eq!(used_column_count(&rows, limits), 10);
    }
}
