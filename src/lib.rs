//! masterfile - structural XLSX template writer
//!
//! Maps columns from an onboarding dataset into the fixed layout of a
//! masterfile template workbook and patches the template's OOXML package
//! directly:
//! - Alias-dictionary column resolution with fuzzy fallback suggestions
//! - Inline-string data writes (the shared string table is never touched)
//! - Table, autoFilter, conditional-formatting, data-validation, merge
//!   and defined-name ranges resynchronized to the new data extent
//! - Byte-identical passthrough of every part the patch does not touch
//!
//! # Usage
//!
//! ```no_run
//! use masterfile::{fill, AliasTable, ScanLimits, SourceTable, TemplateLayout};
//!
//! # fn run() -> masterfile::Result<()> {
//! let template = std::fs::read("masterfile.xlsx")?;
//! let aliases = AliasTable::from_json(r#"{"Partner SKU": ["Seller SKU"]}"#)?;
//! let source = SourceTable::from_rows(
//!     vec!["Seller SKU".to_string()],
//!     &[vec!["ABC-1".to_string()]],
//! );
//!
//! let output = fill(
//!     &template,
//!     &TemplateLayout::default(),
//!     &aliases,
//!     &source,
//!     ScanLimits::default(),
//! )?;
//! println!("matched {} columns", output.report.matched_count());
//! std::fs::write("out.xlsx", output.workbook)?;
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod cell_ref;
pub mod error;
pub mod normalize;
pub mod package;
pub mod resolve;
pub mod xml_helpers;

mod patch;

pub use block::{build_block, used_column_count, ScanLimits, ValueBlock};
pub use error::{MasterfileError, Result};
pub use resolve::{
    resolve_columns, AliasTable, ColumnReport, MappingReport, Resolution, SourceTable, Suggestion,
};

use package::{headers, locator, Package, SHARED_STRINGS_PATH};

/// Fixed geometry of the masterfile template.
#[derive(Debug, Clone)]
pub struct TemplateLayout {
    /// Name of the sheet receiving the data.
    pub sheet_name: String,
    /// Display header row (1-based).
    pub header_row: u32,
    /// Sub-header row below the display headers.
    pub secondary_row: u32,
    /// First data row; everything from here down is replaced.
    pub data_start_row: u32,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            sheet_name: "Template".to_string(),
            header_row: 2,
            secondary_row: 3,
            data_start_row: 4,
        }
    }
}

/// The template's two header rows, as plain text indexed from column A.
#[derive(Debug, Clone)]
pub struct TemplateHeaders {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

/// Read the template's header rows from the target sheet.
pub fn template_headers(template: &[u8], layout: &TemplateLayout) -> Result<TemplateHeaders> {
    let mut pkg = Package::open(template)?;
    let sheet_part = locator::sheet_part_path(&mut pkg, &layout.sheet_name)?;
    let sheet_xml = pkg.part(&sheet_part)?;

    let shared = match pkg.part_if_present(SHARED_STRINGS_PATH)? {
        Some(data) => headers::parse_shared_strings(&data),
        None => Vec::new(),
    };

    let mut rows = headers::read_rows(
        &sheet_xml,
        &[layout.header_row, layout.secondary_row],
        &shared,
    )?;
    Ok(TemplateHeaders {
        primary: rows.remove(&layout.header_row).unwrap_or_default(),
        secondary: rows.remove(&layout.secondary_row).unwrap_or_default(),
    })
}

/// Result of a full fill run.
#[derive(Debug, Clone)]
pub struct FillOutput {
    /// Per-column resolution report, produced before the write.
    pub report: MappingReport,
    /// The rebuilt workbook bytes.
    pub workbook: Vec<u8>,
}

/// Resolve the source against the template and return the mapping report
/// without writing anything.
///
/// The CLI uses this to diagnose mapping problems even when the patch
/// step would fail.
pub fn resolve_template(
    template: &[u8],
    layout: &TemplateLayout,
    aliases: &AliasTable,
    source: &SourceTable,
    limits: ScanLimits,
) -> Result<MappingReport> {
    let headers = template_headers(template, layout)?;
    let used = used_column_count(
        &[headers.primary.as_slice(), headers.secondary.as_slice()],
        limits,
    );
    Ok(resolve_columns(
        truncated(&headers.primary, used),
        truncated(&headers.secondary, used),
        aliases,
        &source.headers,
    ))
}

/// Run the whole pipeline: read headers, resolve, build the value block,
/// patch the package.
pub fn fill(
    template: &[u8],
    layout: &TemplateLayout,
    aliases: &AliasTable,
    source: &SourceTable,
    limits: ScanLimits,
) -> Result<FillOutput> {
    let headers = template_headers(template, layout)?;
    let used = used_column_count(
        &[headers.primary.as_slice(), headers.secondary.as_slice()],
        limits,
    );
    let report = resolve_columns(
        truncated(&headers.primary, used),
        truncated(&headers.secondary, used),
        aliases,
        &source.headers,
    );

    let block = build_block(source.n_rows(), used, &report, source);
    let workbook = patch::apply(
        template,
        &layout.sheet_name,
        layout.header_row,
        layout.data_start_row,
        &block,
    )?;

    Ok(FillOutput { report, workbook })
}

/// Labels up to the used-column count; columns past it are never mapped.
fn truncated(labels: &[String], used: usize) -> &[String] {
    labels.get(..used.min(labels.len())).unwrap_or(labels)
}
