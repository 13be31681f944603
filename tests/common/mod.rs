#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Build a realistic masterfile template package in memory.
///
/// Layout: sheet "Template" with a title row, display headers in row 2,
/// one sub-header in row 3, stale data in rows 4-6, an attached table
/// over A2:E6, conditional formatting, a list validation, a merged title
/// band, two defined names and a calculation chain.
pub fn build_template_xlsx() -> Vec<u8> {
    build_package(TABLE_XML, None)
}

/// Same package, but the attached table declares only three columns over
/// A2:C6, narrower than the five-column header area.
pub fn build_template_xlsx_narrow_table() -> Vec<u8> {
    build_package(NARROW_TABLE_XML, None)
}

/// Same package with one named part left out, for write-failure tests.
pub fn build_template_xlsx_without(part: &str) -> Vec<u8> {
    build_package(TABLE_XML, Some(part))
}

fn build_package(table_xml: &str, skip: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, body) in [
            ("[Content_Types].xml", CONTENT_TYPES_XML),
            ("_rels/.rels", ROOT_RELS_XML),
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
            ("xl/worksheets/sheet1.xml", SHEET_XML),
            ("xl/worksheets/_rels/sheet1.xml.rels", SHEET_RELS_XML),
            ("xl/tables/table1.xml", table_xml),
            ("xl/sharedStrings.xml", SHARED_STRINGS_XML),
            ("xl/styles.xml", STYLES_XML),
            ("xl/calcChain.xml", CALC_CHAIN_XML),
        ] {
            if skip == Some(name) {
                continue;
            }
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Read one part of a package as text. `None` when the entry is absent.
pub fn read_part(data: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    Some(text)
}

/// Read one part's raw bytes. `None` when the entry is absent.
pub fn read_part_bytes(data: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    Some(bytes)
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/tables/table1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Template" sheetId="1" r:id="rId1"/></sheets><definedNames><definedName name="DataArea">Template!$A$4:$E$100</definedName><definedName name="External">'Other'!$A$1:$Z$99</definedName></definedNames></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#;

const SHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:E6"/><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Product Onboarding Masterfile</t></is></c></row><row r="2"><c r="A2" t="s"><v>0</v></c><c r="B2" t="s"><v>1</v></c><c r="C2" t="s"><v>2</v></c><c r="D2" t="s"><v>3</v></c><c r="E2" t="s"><v>4</v></c></row><row r="3"><c r="D3" t="s"><v>5</v></c></row><row r="4"><c r="A4" t="inlineStr"><is><t>OLD-1</t></is></c></row><row r="5"><c r="A5" t="inlineStr"><is><t>OLD-2</t></is></c></row><row r="6"><c r="A6" t="inlineStr"><is><t>OLD-3</t></is></c></row></sheetData><mergeCells count="1"><mergeCell ref="A1:E1"/></mergeCells><conditionalFormatting sqref="A4:E100"><cfRule type="duplicateValues" priority="1"/></conditionalFormatting><dataValidations count="1"><dataValidation type="list" allowBlank="1" sqref="E4:E100"><formula1>"List,Unlist"</formula1></dataValidation></dataValidations><tableParts count="1"><tablePart r:id="rId1"/></tableParts></worksheet>"#;

const SHEET_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableSingleCells" Target="../tables/tableSingleCells1.xml"/></Relationships>"#;

const TABLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Listings" displayName="Listings" ref="A2:E6" headerRowCount="1"><autoFilter ref="A2:E6"/><tableColumns count="5"><tableColumn id="1" name="Partner SKU"/><tableColumn id="2" name="Brand"/><tableColumn id="3" name="Item Name"/><tableColumn id="4" name="Key Product Features"/><tableColumn id="5" name="Listing Action (List or Unlist)"/></tableColumns></table>"#;

const NARROW_TABLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Listings" displayName="Listings" ref="A2:C6" headerRowCount="1"><autoFilter ref="A2:C6"/><tableColumns count="3"><tableColumn id="1" name="Partner SKU"/><tableColumn id="2" name="Brand"/><tableColumn id="3" name="Item Name"/></tableColumns></table>"#;

const SHARED_STRINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="6" uniqueCount="6"><si><t>Partner SKU</t></si><si><t>Brand</t></si><si><t>Item Name</t></si><si><t>Key Product Features</t></si><si><t>Listing Action (List or Unlist)</t></si><si><t>Bullet 1</t></si></sst>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0"/></cellXfs></styleSheet>"#;

const CALC_CHAIN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="A4" i="1"/></calcChain>"#;
