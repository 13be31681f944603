//! Part location via the package relationship graph.
//!
//! The workbook descriptor maps sheet names to relationship ids; the
//! workbook's relationship document maps ids to part targets. Table parts
//! hang off the sheet part's own relationship document. A sheet name or
//! relationship id that does not resolve aborts the patch.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{MasterfileError, Result};

use super::{resolve_target, rels_path_for, Package, WORKBOOK_PATH, WORKBOOK_RELS_PATH};

const TABLE_REL_TYPE: &str = "/table";

/// One entry of a relationship document.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Locate the sheet part path for a named sheet.
pub fn sheet_part_path(pkg: &mut Package<'_>, sheet_name: &str) -> Result<String> {
    let rel_id = sheet_rel_id(pkg, sheet_name)?;
    let rels_bytes = pkg.part(WORKBOOK_RELS_PATH)?;
    let rels = parse_relationships(&rels_bytes);

    let rel = rels
        .iter()
        .find(|r| r.id == rel_id)
        .ok_or_else(|| MasterfileError::Relationship(rel_id.clone()))?;

    Ok(resolve_target("xl", &rel.target))
}

/// Table part paths attached to a sheet part, in relationship order.
///
/// A sheet with no relationship document simply has no tables.
pub fn table_part_paths(pkg: &mut Package<'_>, sheet_part: &str) -> Result<Vec<String>> {
    let rels_path = rels_path_for(sheet_part);
    let Some(rels_bytes) = pkg.part_if_present(&rels_path)? else {
        return Ok(Vec::new());
    };

    let base_dir = sheet_part.rsplit_once('/').map_or("", |(dir, _)| dir);
    let paths = parse_relationships(&rels_bytes)
        .into_iter()
        .filter(|r| is_table_rel(&r.rel_type))
        .map(|r| resolve_target(base_dir, &r.target))
        .collect();
    Ok(paths)
}

/// Matched on the type URI's final segment, so related types such as
/// tableSingleCells do not qualify.
fn is_table_rel(rel_type: &str) -> bool {
    rel_type.ends_with(TABLE_REL_TYPE)
}

/// Look up a sheet's relationship id in the workbook descriptor.
fn sheet_rel_id(pkg: &mut Package<'_>, sheet_name: &str) -> Result<String> {
    let workbook = pkg.part(WORKBOOK_PATH)?;
    let mut xml = Reader::from_reader(workbook.as_slice());
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = String::new();
                    let mut r_id = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            // r:id attribute (namespace prefixed)
                            key if key.ends_with(b":id") || key == b"id" => {
                                r_id = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            _ => {}
                        }
                    }

                    if name == sheet_name && !r_id.is_empty() {
                        return Ok(r_id);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Err(MasterfileError::SheetNotFound(sheet_name.to_string()))
}

/// Parse a relationship document into its entries.
fn parse_relationships(data: &[u8]) -> Vec<Relationship> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            b"Target" => {
                                target = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            b"Type" => {
                                rel_type =
                                    std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            _ => {}
                        }
                    }

                    if !id.is_empty() && !target.is_empty() {
                        rels.push(Relationship {
                            id,
                            rel_type,
                            target,
                        });
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}
