//! Table part inspection and range resynchronization.
//!
//! A table's `ref` must always start at its header row and span exactly as
//! many columns as it declares `tableColumn` entries, and its `autoFilter`
//! mirrors `ref`. Only the ranges are rewritten; column definitions are
//! never touched. A table that fails to parse is skipped rather than
//! aborting the patch.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::cell_ref::Range;
use crate::error::Result;
use crate::xml_helpers::{attr_string, replace_attr};

/// Structure of one attached table part.
#[derive(Debug, Clone)]
pub(crate) struct TableInfo {
    pub path: String,
    /// Declared range before patching.
    pub range: Range,
    /// Number of `tableColumn` definitions.
    pub column_count: u32,
}

impl TableInfo {
    /// Column width the table constrains the write to.
    pub fn width(&self) -> u32 {
        if self.column_count > 0 {
            self.column_count
        } else {
            self.range.width()
        }
    }
}

/// Read a table part's range and column count.
///
/// Returns `None` when the part has no parseable `ref`; the caller treats
/// that table as unpatchable and leaves it alone.
pub(crate) fn inspect_table(data: &[u8], path: &str) -> Option<TableInfo> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut range: Option<Range> = None;
    let mut column_count: u32 = 0;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"table" => {
                    range = attr_string(e, b"ref").and_then(|r| Range::parse(&r));
                }
                b"tableColumn" => column_count += 1,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Some(TableInfo {
        path: path.to_string(),
        range: range?,
        column_count,
    })
}

/// Rewrite a table part for the new data bounds.
///
/// The new range keeps the table's start column, anchors at the header
/// row, and extends down to `last_row`; the table's own autoFilter is set
/// to the identical range.
pub(crate) fn patch_table_xml(
    original: &[u8],
    info: &TableInfo,
    header_row: u32,
    last_row: u32,
) -> Result<Vec<u8>> {
    let start_col = info.range.start_col;
    let new_range = Range {
        start_col,
        start_row: header_row,
        end_col: start_col + info.width().max(1) - 1,
        end_row: last_row.max(header_row),
    };
    let new_ref = new_range.to_a1();

    let mut xml = Reader::from_reader(original);
    xml.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if is_ranged(e) => {
                writer.write_event(Event::Start(replace_attr(e, "ref", &new_ref)))?;
            }
            Event::Empty(ref e) if is_ranged(e) => {
                writer.write_event(Event::Empty(replace_attr(e, "ref", &new_ref)))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn is_ranged(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"table" | b"autoFilter")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const TABLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Products" displayName="Products" ref="A2:E10">
<autoFilter ref="A2:E10"/>
<tableColumns count="5">
<tableColumn id="1" name="SKU"/>
<tableColumn id="2" name="Brand"/>
<tableColumn id="3" name="Title"/>
<tableColumn id="4" name="Price"/>
<tableColumn id="5" name="Qty"/>
</tableColumns>
</table>"#;

    #[test]
    fn test_inspect_table() {
        let info = inspect_table(TABLE_XML.as_bytes(), "xl/tables/table1.xml").unwrap();
        assert_eq!(info.column_count, 5);
        assert_eq!(info.width(), 5);
        assert_eq!(info.range.to_a1(), "A2:E10");
    }

    #[test]
    fn test_inspect_table_without_ref_is_skipped() {
        let xml = br#"<table id="1" name="Broken"><tableColumns count="1"><tableColumn id="1" name="A"/></tableColumns></table>"#;
        assert!(inspect_table(xml, "xl/tables/table1.xml").is_none());
    }

    #[test]
    fn test_patch_table_rewrites_both_ranges() {
        let info = inspect_table(TABLE_XML.as_bytes(), "xl/tables/table1.xml").unwrap();
        let out = patch_table_xml(TABLE_XML.as_bytes(), &info, 2, 40).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"ref="A2:E40""#));
        assert!(!out.contains(r#"ref="A2:E10""#));
        // Column definitions are untouched.
        assert!(out.contains(r#"<tableColumn id="5" name="Qty"/>"#));
        assert!(out.contains(r#"count="5""#));
    }

    #[test]
    fn test_patch_table_keeps_start_column() {
        let xml = TABLE_XML.replace("A2:E10", "C2:G10");
        let info = inspect_table(xml.as_bytes(), "xl/tables/table1.xml").unwrap();
        let out = patch_table_xml(xml.as_bytes(), &info, 2, 12).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"ref="C2:G12""#));
    }
}
