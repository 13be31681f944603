//! Structural patching of the template package.
//!
//! Applies the value block to the target sheet and resynchronizes every
//! structure that depends on the data region's extent: table ranges,
//! autoFilters, conditional formatting, data validations, merges, the
//! sheet dimension and workbook defined names. The calculation chain is
//! dropped so the consuming application rebuilds formula results. Every
//! part the patch does not touch is copied through byte-identical.

pub(crate) mod content_types;
pub(crate) mod repack;
pub(crate) mod sheet;
pub(crate) mod table;
pub(crate) mod workbook;

use std::collections::{HashMap, HashSet};

use crate::block::ValueBlock;
use crate::error::Result;
use crate::package::{locator, Package, CALC_CHAIN_PATH, CONTENT_TYPES_PATH, WORKBOOK_PATH};

/// Patch the template bytes in one pass and return the rebuilt package.
///
/// `header_row` is the template's display header row; `data_start_row` the
/// first row replaced by block data. Tables that fail to parse are left
/// untouched; a sheet or relationship that fails to resolve aborts.
pub(crate) fn apply(
    template: &[u8],
    sheet_name: &str,
    header_row: u32,
    data_start_row: u32,
    block: &ValueBlock,
) -> Result<Vec<u8>> {
    let mut pkg = Package::open(template)?;
    let sheet_part = locator::sheet_part_path(&mut pkg, sheet_name)?;
    let table_paths = locator::table_part_paths(&mut pkg, &sheet_part)?;

    let mut tables = Vec::with_capacity(table_paths.len());
    for path in &table_paths {
        let data = pkg.part(path)?;
        if let Some(info) = table::inspect_table(&data, path) {
            tables.push((info, data));
        }
    }

    // The narrowest attached table caps how many columns are written, so
    // no table's declared width ever exceeds the data it spans.
    let block_width = u32::try_from(block.n_cols()).unwrap_or(u32::MAX);
    let write_width = tables
        .iter()
        .map(|(info, _)| info.width())
        .fold(block_width, u32::min);

    let n_rows = u32::try_from(block.n_rows()).unwrap_or(u32::MAX);
    let last_row = data_start_row
        .saturating_add(n_rows)
        .saturating_sub(1)
        .max(header_row);
    let last_col = write_width.max(1);

    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();

    let sheet_xml = pkg.part(&sheet_part)?;
    let patched = sheet::patch_sheet_xml(
        &sheet_xml,
        &sheet::SheetPatch {
            data_start_row,
            write_width: last_col,
            last_row,
            last_col,
            block,
        },
    )?;
    replacements.insert(sheet_part.clone(), patched);

    for (info, data) in &tables {
        let patched = table::patch_table_xml(data, info, header_row, last_row)?;
        if &patched != data {
            replacements.insert(info.path.clone(), patched);
        }
    }

    let workbook_xml = pkg.part(WORKBOOK_PATH)?;
    if let Some(patched) =
        workbook::patch_workbook_xml(&workbook_xml, sheet_name, last_col, last_row)?
    {
        replacements.insert(WORKBOOK_PATH.to_string(), patched);
    }

    let types_xml = pkg.part(CONTENT_TYPES_PATH)?;
    if let Some(patched) = content_types::strip_calc_chain_override(&types_xml)? {
        replacements.insert(CONTENT_TYPES_PATH.to_string(), patched);
    }

    let mut drop = HashSet::new();
    drop.insert(CALC_CHAIN_PATH.to_string());

    repack::repack(template, &replacements, &drop)
}
