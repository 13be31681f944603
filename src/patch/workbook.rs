//! Defined-name clamping in the workbook part.
//!
//! A workbook-scoped defined name may embed absolute references into the
//! patched sheet (`'Template'!$A$2:$H$500`, `Template!$A:$H`,
//! `Template!$1:$4`). After the data region is rewritten those references
//! must not point past the sheet's new bounds. References into other
//! sheets, and anything that fails to parse, ride through untouched.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::cell_ref::Range;
use crate::error::Result;

/// Rewrite `xl/workbook.xml`, clamping defined-name references into the
/// target sheet to `[1, last_col] x [1, last_row]`.
///
/// Returns `None` when no defined name changed, so the caller can leave
/// the original part byte-identical.
pub(crate) fn patch_workbook_xml(
    original: &[u8],
    sheet_name: &str,
    last_col: u32,
    last_row: u32,
) -> Result<Option<Vec<u8>>> {
    let mut xml = Reader::from_reader(original);
    xml.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut buf = Vec::new();
    let mut any_changed = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"definedName" => {
                writer.write_event(Event::Start(e.to_owned()))?;
                let changed =
                    rewrite_defined_name(&mut xml, &mut writer, sheet_name, last_col, last_row)?;
                any_changed |= changed;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    if any_changed {
        Ok(Some(writer.into_inner()))
    } else {
        Ok(None)
    }
}

/// Consume one definedName body, emitting its (possibly clamped) formula
/// text and closing tag. Returns whether the text changed.
fn rewrite_defined_name(
    xml: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    sheet_name: &str,
    last_col: u32,
    last_row: u32,
) -> Result<bool> {
    let mut buf = Vec::new();
    let mut raw = String::new();
    let mut text = String::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Text(ref e) => {
                raw.push_str(std::str::from_utf8(e.as_ref()).unwrap_or(""));
                if let Ok(t) = e.unescape() {
                    text.push_str(&t);
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"definedName" => {
                let rewritten = clamp_sheet_refs(&text, sheet_name, last_col, last_row);
                let changed = rewritten != text;
                if changed {
                    writer.write_event(Event::Text(BytesText::new(&rewritten)))?;
                } else {
                    writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?;
                }
                writer.write_event(Event::End(e.to_owned()))?;
                return Ok(changed);
            }
            Event::Eof => {
                return Err(crate::error::MasterfileError::Invalid(
                    "unexpected EOF inside definedName".to_string(),
                ))
            }
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }
}

/// Clamp every sheet-qualified reference into `sheet_name` found in a
/// formula text. Quoted (`'My Sheet'!`) and bare (`Template!`) sheet
/// qualifiers are recognized; sheet-name comparison is case-insensitive.
pub(crate) fn clamp_sheet_refs(
    formula: &str,
    sheet_name: &str,
    last_col: u32,
    last_row: u32,
) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0usize;

    while let Some(&c) = chars.get(i) {
        if c == '\'' {
            if let Some((name, after_quote)) = parse_quoted_name(&chars, i) {
                let raw: String = chars.get(i..after_quote).unwrap_or(&[]).iter().collect();
                out.push_str(&raw);
                i = after_quote;
                if chars.get(i) == Some(&'!') {
                    out.push('!');
                    i += 1;
                    i = emit_ref_token(&chars, i, &mut out, |token| {
                        if name.eq_ignore_ascii_case(sheet_name) {
                            clamp_ref_token(token, last_col, last_row)
                        } else {
                            None
                        }
                    });
                }
                continue;
            }
            out.push(c);
            i += 1;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            let start = i;
            while chars
                .get(i)
                .is_some_and(|&ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
            {
                i += 1;
            }
            let name: String = chars.get(start..i).unwrap_or(&[]).iter().collect();
            out.push_str(&name);
            if chars.get(i) == Some(&'!') {
                out.push('!');
                i += 1;
                i = emit_ref_token(&chars, i, &mut out, |token| {
                    if name.eq_ignore_ascii_case(sheet_name) {
                        clamp_ref_token(token, last_col, last_row)
                    } else {
                        None
                    }
                });
            }
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}

/// Parse a quoted sheet name starting at the opening quote.
///
/// Doubled quotes inside are the escape form. Returns the unescaped name
/// and the index just past the closing quote.
fn parse_quoted_name(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut i = start + 1;
    loop {
        let c = *chars.get(i)?;
        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                name.push('\'');
                i += 2;
            } else {
                return Some((name, i + 1));
            }
        } else {
            name.push(c);
            i += 1;
        }
    }
}

/// Consume the reference token after a `!`, emitting either its clamped
/// form (when `clamp` returns one) or the original token.
fn emit_ref_token<F>(chars: &[char], start: usize, out: &mut String, clamp: F) -> usize
where
    F: FnOnce(&str) -> Option<String>,
{
    let mut i = start;
    while chars
        .get(i)
        .is_some_and(|&ch| ch == '$' || ch == ':' || ch.is_ascii_alphanumeric())
    {
        i += 1;
    }
    let token: String = chars.get(start..i).unwrap_or(&[]).iter().collect();
    match clamp(&token) {
        Some(rewritten) => out.push_str(&rewritten),
        None => out.push_str(&token),
    }
    i
}

/// Classify and clamp one reference token.
///
/// Handles full cell ranges, single cells, column-only ranges and
/// row-only ranges. Returns `None` when the token does not fit any shape
/// (leave it untouched).
fn clamp_ref_token(token: &str, last_col: u32, last_row: u32) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    if let Some((left, right)) = token.split_once(':') {
        if let (Some((c1, r1)), Some((c2, r2))) = (parse_cell_part(left), parse_cell_part(right)) {
            let clamped = Range {
                start_col: c1,
                start_row: r1,
                end_col: c2,
                end_row: r2,
            }
            .clamp_to(last_col, last_row);
            return Some(format!(
                "${}${}:${}${}",
                crate::cell_ref::col_to_letter(clamped.start_col),
                clamped.start_row,
                crate::cell_ref::col_to_letter(clamped.end_col),
                clamped.end_row
            ));
        }
        if let (Some(c1), Some(c2)) = (parse_col_part(left), parse_col_part(right)) {
            let (lo, hi) = clamp_pair(c1, c2, last_col);
            return Some(format!(
                "${}:${}",
                crate::cell_ref::col_to_letter(lo),
                crate::cell_ref::col_to_letter(hi)
            ));
        }
        if let (Some(r1), Some(r2)) = (parse_row_part(left), parse_row_part(right)) {
            let (lo, hi) = clamp_pair(r1, r2, last_row);
            return Some(format!("${lo}:${hi}"));
        }
        return None;
    }

    let (col, row) = parse_cell_part(token)?;
    let clamped = Range {
        start_col: col,
        start_row: row,
        end_col: col,
        end_row: row,
    }
    .clamp_to(last_col, last_row);
    Some(format!(
        "${}${}",
        crate::cell_ref::col_to_letter(clamped.start_col),
        clamped.start_row
    ))
}

/// Clamp a scalar pair into `[1, max]`, swapping when inverted.
fn clamp_pair(a: u32, b: u32, max: u32) -> (u32, u32) {
    let a = a.clamp(1, max.max(1));
    let b = b.clamp(1, max.max(1));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// "$B$5" / "B5" -> (col, row).
fn parse_cell_part(part: &str) -> Option<(u32, u32)> {
    let stripped: String = part.chars().filter(|&c| c != '$').collect();
    let has_alpha = stripped.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = stripped.chars().any(|c| c.is_ascii_digit());
    if !has_alpha || !has_digit {
        return None;
    }
    crate::cell_ref::parse_cell_ref(&stripped)
}

/// "$H" / "H" -> column number.
fn parse_col_part(part: &str) -> Option<u32> {
    let stripped: String = part.chars().filter(|&c| c != '$').collect();
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col: u32 = 0;
    for ch in stripped.chars() {
        let upper = ch.to_ascii_uppercase();
        col = col.checked_mul(26)?.checked_add(upper as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

/// "$40" / "40" -> row number.
fn parse_row_part(part: &str) -> Option<u32> {
    let stripped: String = part.chars().filter(|&c| c != '$').collect();
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    stripped.parse().ok().filter(|&r| r > 0)
}
