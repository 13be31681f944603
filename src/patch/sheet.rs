//! Streaming rewrite of a worksheet part.
//!
//! One pass over the sheet XML: the data region's rows are dropped and
//! replaced with the value block (inline-string cells, so the shared
//! string table is never touched), the declared dimension is widened to
//! cover the new data, and every structural range that could point past
//! the data boundary (autoFilter, conditionalFormatting, dataValidation,
//! mergeCell) is clamped into the new bounds. Everything else re-emits
//! from the original event buffers and stays byte-stable.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::block::ValueBlock;
use crate::cell_ref::{clamp_sqref, col_to_letter, Range};
use crate::error::Result;
use crate::xml_helpers::{attr_string, attr_u32, replace_attr};

/// Parameters for one sheet rewrite.
pub(crate) struct SheetPatch<'a> {
    /// First data row (1-based); every row at or after it is replaced.
    pub data_start_row: u32,
    /// Columns written per block row.
    pub write_width: u32,
    /// New last occupied row (bounds clamp target).
    pub last_row: u32,
    /// New last occupied column (bounds clamp target).
    pub last_col: u32,
    pub block: &'a ValueBlock,
}

/// Rewrite a sheet part, returning the new XML bytes.
pub(crate) fn patch_sheet_xml(original: &[u8], patch: &SheetPatch<'_>) -> Result<Vec<u8>> {
    let mut xml = Reader::from_reader(original);
    xml.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                writer.write_event(Event::Start(e.to_owned()))?;
                rewrite_sheet_data(&mut xml, &mut writer, patch)?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                // Convert `<sheetData/>` so the block rows have a home.
                writer.write_event(Event::Start(e.to_owned()))?;
                write_block_rows(&mut writer, patch)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::Start(ref e) => match rewrite_structural(e, patch) {
                Some(rewritten) => writer.write_event(Event::Start(rewritten))?,
                None => writer.write_event(Event::Start(e.to_owned()))?,
            },
            Event::Empty(ref e) => match rewrite_structural(e, patch) {
                Some(rewritten) => writer.write_event(Event::Empty(rewritten))?,
                None => writer.write_event(Event::Empty(e.to_owned()))?,
            },
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Rewrite a structural element's range attribute when it needs clamping.
///
/// Returns `None` when the element is not one of the clamped kinds or its
/// range already lies within bounds (the original bytes then pass through
/// untouched).
fn rewrite_structural(e: &BytesStart<'_>, patch: &SheetPatch<'_>) -> Option<BytesStart<'static>> {
    match e.local_name().as_ref() {
        b"dimension" => widen_dimension(e, patch),
        b"autoFilter" | b"mergeCell" => clamp_range_attr(e, b"ref", patch),
        b"conditionalFormatting" | b"dataValidation" => clamp_range_attr(e, b"sqref", patch),
        _ => None,
    }
}

/// Widened dimension: the original bounds unioned with the block's new
/// bottom-right corner. Never shrinks.
fn widen_dimension(e: &BytesStart<'_>, patch: &SheetPatch<'_>) -> Option<BytesStart<'static>> {
    let parsed = attr_string(e, b"ref").and_then(|r| Range::parse(&r));
    let old = parsed.unwrap_or(Range {
        start_col: 1,
        start_row: 1,
        end_col: 1,
        end_row: 1,
    });
    let new_corner = Range {
        start_col: old.start_col,
        start_row: old.start_row,
        end_col: patch.last_col,
        end_row: patch.last_row,
    };
    let unioned = old.union(&new_corner);
    if parsed == Some(unioned) {
        return None;
    }
    Some(replace_attr(e, "ref", &unioned.to_a1()))
}

/// Clamp a single range-valued attribute (ref or sqref) into bounds.
fn clamp_range_attr(
    e: &BytesStart<'_>,
    key: &[u8],
    patch: &SheetPatch<'_>,
) -> Option<BytesStart<'static>> {
    let value = attr_string(e, key)?;
    let clamped = clamp_sqref(&value, patch.last_col, patch.last_row);
    if clamped == value {
        return None;
    }
    let key_str = std::str::from_utf8(key).ok()?;
    Some(replace_attr(e, key_str, &clamped))
}

/// Process everything inside `<sheetData>`: drop rows at or after the data
/// start, pass earlier rows through, then append the block rows before the
/// closing tag.
fn rewrite_sheet_data(
    xml: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    patch: &SheetPatch<'_>,
) -> Result<()> {
    let mut buf = Vec::new();
    let mut skip_buf = Vec::new();
    let mut current_row: u32 = 0;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                current_row = attr_u32(e, b"r").unwrap_or(current_row + 1);
                if current_row >= patch.data_start_row {
                    // Replaced region: drop the whole row subtree.
                    let end = e.to_owned();
                    xml.read_to_end_into(end.name(), &mut skip_buf)?;
                    skip_buf.clear();
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                current_row = attr_u32(e, b"r").unwrap_or(current_row + 1);
                if current_row < patch.data_start_row {
                    writer.write_event(Event::Empty(e.to_owned()))?;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                write_block_rows(writer, patch)?;
                writer.write_event(Event::End(e.to_owned()))?;
                return Ok(());
            }
            Event::Eof => {
                return Err(crate::error::MasterfileError::Invalid(
                    "unexpected EOF inside sheetData".to_string(),
                ))
            }
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }
}

/// Append every block row, in order, starting at the data start row.
///
/// Cells are emitted only for non-empty values, as inline strings.
fn write_block_rows(writer: &mut Writer<Vec<u8>>, patch: &SheetPatch<'_>) -> Result<()> {
    let width = usize::try_from(patch.write_width).unwrap_or(0);
    let spans = format!("1:{}", patch.write_width.max(1));

    for i in 0..patch.block.n_rows() {
        let Ok(offset) = u32::try_from(i) else { break };
        let row_num = patch.data_start_row.saturating_add(offset);

        let mut row = BytesStart::new("row");
        row.push_attribute(("r", row_num.to_string().as_str()));
        row.push_attribute(("spans", spans.as_str()));
        writer.write_event(Event::Start(row))?;

        for col in 0..width {
            let value = patch.block.get(i, col);
            if value.is_empty() {
                continue;
            }
            let Ok(col_offset) = u32::try_from(col) else {
                break;
            };
            let cell_ref = format!("{}{row_num}", col_to_letter(col_offset + 1));

            let mut cell = BytesStart::new("c");
            cell.push_attribute(("r", cell_ref.as_str()));
            cell.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(cell))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    Ok(())
}
