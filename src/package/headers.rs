//! Header-row extraction from a sheet part.
//!
//! The patcher needs the template's display headers (and the secondary
//! sub-header row) as plain text. Cells may be shared-string references,
//! inline strings, or literal values; everything resolves to text here.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::cell_ref::parse_cell_ref;
use crate::error::Result;
use crate::xml_helpers::attr_string;

/// Parse the shared string table into plain strings.
///
/// Rich-text runs are flattened by concatenating their `<t>` fragments.
#[must_use]
pub fn parse_shared_strings(data: &[u8]) -> Vec<String> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(current.clone());
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
}

/// Extract the cell text of selected rows from a sheet part.
///
/// Returns, per requested row number, a dense vector indexed from column A
/// (missing cells are empty strings). Shared-string cells are resolved
/// through `shared`.
pub fn read_rows(
    sheet_xml: &[u8],
    wanted_rows: &[u32],
    shared: &[String],
) -> Result<HashMap<u32, Vec<String>>> {
    let mut xml = Reader::from_reader(sheet_xml);
    xml.trim_text(false);

    let mut out: HashMap<u32, Vec<String>> = HashMap::new();
    for row in wanted_rows {
        out.insert(*row, Vec::new());
    }

    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut row_wanted = false;

    // Per-cell capture state.
    let mut cell_col: u32 = 0;
    let mut cell_type = CellTextKind::Value;
    let mut cell_text = String::new();
    let mut in_value = false;
    let mut in_inline_t = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let r_attr = attr_string(e, b"r").and_then(|v| v.parse::<u32>().ok());
                current_row = r_attr.unwrap_or(current_row + 1);
                row_wanted = wanted_rows.contains(&current_row);
                cell_col = 0;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if row_wanted && e.local_name().as_ref() == b"c" =>
            {
                cell_col = attr_string(e, b"r")
                    .and_then(|r| parse_cell_ref(&r))
                    .map_or(cell_col + 1, |(col, _)| col);
                cell_type = match attr_string(e, b"t").as_deref() {
                    Some("s") => CellTextKind::Shared,
                    Some("inlineStr") => CellTextKind::Inline,
                    _ => CellTextKind::Value,
                };
                cell_text.clear();
                in_value = false;
                in_inline_t = false;
            }
            Event::Start(ref e) if row_wanted => match e.local_name().as_ref() {
                b"v" => in_value = true,
                b"t" if cell_type == CellTextKind::Inline => in_inline_t = true,
                _ => {}
            },
            Event::Text(ref e) if in_value || in_inline_t => {
                if let Ok(text) = e.unescape() {
                    cell_text.push_str(&text);
                }
            }
            Event::End(ref e) if row_wanted => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_t = false,
                b"c" => {
                    let value = match cell_type {
                        CellTextKind::Shared => cell_text
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|idx| shared.get(idx).cloned())
                            .unwrap_or_default(),
                        CellTextKind::Inline | CellTextKind::Value => cell_text.clone(),
                    };
                    if let Some(cells) = out.get_mut(&current_row) {
                        set_cell(cells, cell_col, value);
                    }
                }
                b"row" => row_wanted = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellTextKind {
    Shared,
    Inline,
    Value,
}

/// Place a value at a 1-based column, growing the row with empty cells.
fn set_cell(cells: &mut Vec<String>, col: u32, value: String) {
    if col == 0 {
        return;
    }
    let Ok(idx) = usize::try_from(col - 1) else {
        return;
    };
    if cells.len() <= idx {
        cells.resize(idx + 1, String::new());
    }
    if let Some(slot) = cells.get_mut(idx) {
        *slot = value;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c></row>
<row r="2"><c r="A2" t="s"><v>1</v></c><c r="C2" t="inlineStr"><is><t>Inline Header</t></is></c><c r="D2"><v>42</v></c></row>
</sheetData>
</worksheet>"#;

    #[test]
    fn test_read_rows_mixed_cell_types() {
        let shared = vec!["internal_key".to_string(), "Partner SKU".to_string()];
        let rows = read_rows(SHEET.as_bytes(), &[2], &shared).unwrap();
        let row2 = &rows[&2];
        assert_eq!(row2[0], "Partner SKU");
        assert_eq!(row2[1], "");
        assert_eq!(row2[2], "Inline Header");
        assert_eq!(row2[3], "42");
    }

    #[test]
    fn test_read_rows_missing_row_is_empty() {
        let rows = read_rows(SHEET.as_bytes(), &[3], &[]).unwrap();
        assert!(rows[&3].is_empty());
    }

    #[test]
    fn test_parse_shared_strings_flattens_rich_text() {
        let xml = br#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<si><t>plain</t></si>
<si><r><t>ri</t></r><r><t>ch</t></r></si>
</sst>"#;
        let strings = parse_shared_strings(xml);
        assert_eq!(strings, vec!["plain".to_string(), "rich".to_string()]);
    }
}
