//! Column resolution: maps template columns to onboarding source columns.
//!
//! Resolution is a pure function over header labels. Each template column
//! ends up `Resolved` to a source column, `ConstantFill` for the fixed
//! listing-action sentinel, or `Unmatched` with fuzzy suggestions. An
//! unmatched column is a reportable condition, never an error.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{MasterfileError, Result};
use crate::normalize::{normalize, similarity};

/// Template columns whose primary label normalizes to this key take their
/// effective label from the secondary header row (per-bullet sub-headers).
const KEY_FEATURES_SENTINEL: &str = "key product features";

/// Columns with this primary label and no source match are constant-filled.
const LISTING_ACTION_SENTINEL: &str = "listing action list or unlist";

/// Fill literal for the listing-action sentinel.
const LISTING_ACTION_FILL: &str = "List";

/// Number of fuzzy suggestions reported for an unmatched column.
const SUGGESTION_COUNT: usize = 3;

/// Ordered alias lists keyed by the normalized template header label.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: HashMap<String, Vec<String>>,
}

impl AliasTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register aliases for a template header label.
    ///
    /// The display label itself is appended as a final fallback alias when
    /// not already present, so an exact header match always works.
    pub fn insert(&mut self, label: &str, aliases: Vec<String>) {
        let mut aliases = aliases;
        if !aliases.iter().any(|a| a == label) {
            aliases.push(label.to_string());
        }
        self.map.insert(normalize(label), aliases);
    }

    /// Parse the mapping JSON shape `{"Master header": ["alias", ...]}`.
    ///
    /// Scalar string values are promoted to singleton lists.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| MasterfileError::Mapping(format!("mapping JSON parse error: {e}")))?;
        let serde_json::Value::Object(entries) = value else {
            return Err(MasterfileError::Mapping(
                "mapping JSON must be an object of header -> alias list".to_string(),
            ));
        };

        let mut table = Self::new();
        for (label, aliases_value) in entries {
            let aliases = match aliases_value {
                serde_json::Value::String(s) => vec![s],
                serde_json::Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => out.push(s),
                            other => {
                                return Err(MasterfileError::Mapping(format!(
                                    "alias for {label:?} must be a string, got {other}"
                                )))
                            }
                        }
                    }
                    out
                }
                other => {
                    return Err(MasterfileError::Mapping(format!(
                        "aliases for {label:?} must be a string or list, got {other}"
                    )))
                }
            };
            table.insert(&label, aliases);
        }
        Ok(table)
    }

    /// Ordered aliases for a normalized label, if registered.
    #[must_use]
    pub fn aliases_for(&self, normalized_label: &str) -> Option<&[String]> {
        self.map.get(normalized_label).map(Vec::as_slice)
    }
}

/// The onboarding dataset: ordered headers plus per-column value lists.
///
/// Selection of this table from a multi-sheet workbook is the caller's
/// concern; the resolver and block builder only see this shape.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<String>>,
}

impl SourceTable {
    /// Build from row-major data (row 1 = headers already split off).
    #[must_use]
    pub fn from_rows(headers: Vec<String>, rows: &[Vec<String>]) -> Self {
        let n_cols = headers.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); n_cols];
        for row in rows {
            for (col, values) in columns.iter_mut().enumerate() {
                values.push(row.get(col).cloned().unwrap_or_default());
            }
        }
        Self { headers, columns }
    }

    /// Dataset row count (longest column).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A fuzzy-match candidate for an unmatched column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Original source header text.
    pub header: String,
    /// Similarity ratio in `[0.0, 1.0]`.
    pub score: f64,
}

/// How one template column resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Matched a source column via the recorded alias.
    Resolved {
        /// 0-based index into the source table's columns.
        source_col: usize,
        /// The alias that won (first match in alias order).
        alias: String,
    },
    /// No match; every data row receives the fill literal.
    ConstantFill { value: String },
    /// No match and no sentinel; cells stay empty.
    Unmatched { suggestions: Vec<Suggestion> },
}

/// Resolution outcome for one template column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    /// 1-based template column number.
    pub column: usize,
    /// Effective label the column was matched under.
    pub label: String,
    pub resolution: Resolution,
}

/// The full per-column resolution report.
///
/// Produced unconditionally, before any write is attempted, so mapping
/// problems can be diagnosed even when the patch step fails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub columns: Vec<ColumnReport>,
}

impl MappingReport {
    /// Count of columns resolved to a source column.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c.resolution, Resolution::Resolved { .. }))
            .count()
    }

    /// Labels of unmatched columns.
    #[must_use]
    pub fn unmatched_labels(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| matches!(c.resolution, Resolution::Unmatched { .. }))
            .map(|c| c.label.as_str())
            .collect()
    }
}

/// Resolve every template column against the source headers.
///
/// `primary_labels` is the template's display header row; `secondary_labels`
/// the row below it (used only for the key-product-features group; pass an
/// empty slice when absent). Columns whose effective label normalizes to
/// empty are skipped and do not appear in the report.
#[must_use]
pub fn resolve_columns(
    primary_labels: &[String],
    secondary_labels: &[String],
    aliases: &AliasTable,
    source_headers: &[String],
) -> MappingReport {
    // Later duplicate headers shadow earlier ones, like the source table
    // being keyed by normalized header.
    let mut source_by_key: HashMap<String, usize> = HashMap::new();
    for (idx, header) in source_headers.iter().enumerate() {
        source_by_key.insert(normalize(header), idx);
    }

    let mut report = MappingReport::default();

    for (idx, primary) in primary_labels.iter().enumerate() {
        let column = idx + 1;
        let primary_key = normalize(primary);

        let effective = if primary_key == KEY_FEATURES_SENTINEL {
            match secondary_labels.get(idx) {
                Some(secondary) if !secondary.trim().is_empty() => secondary.as_str(),
                _ => primary.as_str(),
            }
        } else {
            primary.as_str()
        };

        let effective_key = normalize(effective);
        if effective_key.is_empty() {
            continue;
        }

        let fallback = [effective.to_string()];
        let alias_list = aliases
            .aliases_for(&effective_key)
            .unwrap_or(fallback.as_slice());

        // First alias whose normalized form matches a source header wins.
        let resolved = alias_list.iter().find_map(|alias| {
            source_by_key
                .get(&normalize(alias))
                .map(|&source_col| (source_col, alias.clone()))
        });

        let resolution = match resolved {
            Some((source_col, alias)) => Resolution::Resolved { source_col, alias },
            None if primary_key == LISTING_ACTION_SENTINEL => Resolution::ConstantFill {
                value: LISTING_ACTION_FILL.to_string(),
            },
            None => Resolution::Unmatched {
                suggestions: top_matches(effective, source_headers),
            },
        };

        report.columns.push(ColumnReport {
            column,
            label: effective.to_string(),
            resolution,
        });
    }

    report
}

/// Best suggestion candidates by similarity ratio, descending, ties broken
/// by the source header's original position.
fn top_matches(query: &str, candidates: &[String]) -> Vec<Suggestion> {
    let query_key = normalize(query);
    let mut scored: Vec<Suggestion> = candidates
        .iter()
        .map(|header| Suggestion {
            header: header.clone(),
            score: similarity(&query_key, &normalize(header)),
        })
        .collect();
    // Stable sort keeps input order for equal scores.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(SUGGESTION_COUNT);
    scored
}
