//! Spreadsheet package access.
//!
//! A thin wrapper over the zip archive plus the relationship-graph
//! navigation needed to find the sheet and table parts to patch. Parts
//! are read whole into memory; the patcher never streams from the
//! archive directly.

pub mod headers;
pub mod locator;

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::{MasterfileError, Result};

/// Well-known part paths.
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
pub const CALC_CHAIN_PATH: &str = "xl/calcChain.xml";
pub const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

/// An opened spreadsheet package.
pub struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    /// Open a package from its raw bytes.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self { archive })
    }

    /// Whether a part exists in the archive.
    #[must_use]
    pub fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Read a part's bytes, failing with `MissingPart` when absent.
    pub fn part(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| MasterfileError::MissingPart(name.to_string()))?;
        let mut buf = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read a part's bytes when present.
    pub fn part_if_present(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if !self.has_part(name) {
            return Ok(None);
        }
        self.part(name).map(Some)
    }
}

/// Path of the relationship document attached to a part.
///
/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
#[must_use]
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// Handles absolute targets (leading `/`) and `.`/`..` segments.
#[must_use]
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "../tables/table1.xml"),
            "xl/tables/table1.xml"
        );
        assert_eq!(
            resolve_target("xl", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(resolve_target("xl", "./styles.xml"), "xl/styles.xml");
    }
}
