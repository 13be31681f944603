//! Reassemble the package archive around the patched parts.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression
//! cost); replaced parts are deflated fresh. Dropped parts are simply not
//! copied.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::Result;

/// Rewrite the archive, substituting `replacements` and omitting `drop`.
///
/// Entry order follows the original archive; replaced entries keep their
/// position.
pub(crate) fn repack(
    original: &[u8],
    replacements: &HashMap<String, Vec<u8>>,
    drop: &HashSet<String>,
) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original))?;

    let buf: Vec<u8> = Vec::with_capacity(original.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if drop.contains(name.as_str()) {
            continue;
        }

        if let Some(data) = replacements.get(name.as_str()) {
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            writer.start_file(&name, options)?;
            writer.write_all(data)?;
            continue;
        }

        writer.raw_copy_file(entry)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
