//! Content-type cleanup after the calculation chain is dropped.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::Result;
use crate::xml_helpers::attr_string;

const CALC_CHAIN_PART_NAME: &str = "/xl/calcChain.xml";

/// Remove the calcChain `<Override>` from `[Content_Types].xml`.
///
/// Returns `None` when no such override exists, so the caller can leave
/// the original part byte-identical.
pub(crate) fn strip_calc_chain_override(original: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut xml = Reader::from_reader(original);
    xml.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut buf = Vec::new();
    let mut removed = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e)
                if e.local_name().as_ref() == b"Override"
                    && attr_string(e, b"PartName").as_deref() == Some(CALC_CHAIN_PART_NAME) =>
            {
                removed = true;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    if removed {
        Ok(Some(writer.into_inner()))
    } else {
        Ok(None)
    }
}
