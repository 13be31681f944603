//! CLI tool for masterfile - fills a template workbook from a CSV dataset
//!
//! Usage:
//!   masterfile_cli <template.xlsx> <data.csv> <mapping.json>              # report to stdout, write masterfile_out.xlsx
//!   masterfile_cli <template.xlsx> <data.csv> <mapping.json> -o out.xlsx  # write to out.xlsx

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use masterfile::{fill, resolve_template, AliasTable, ScanLimits, SourceTable, TemplateLayout};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: masterfile_cli <template.xlsx> <data.csv> <mapping.json> [-o output.xlsx]");
        std::process::exit(1);
    }

    let template_path = &args[1];
    let csv_path = &args[2];
    let mapping_path = &args[3];
    let output_path = if args.len() > 5 && args[4] == "-o" {
        args[5].as_str()
    } else {
        "masterfile_out.xlsx"
    };

    let template = match fs::read(template_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {}", template_path, e);
            std::process::exit(1);
        }
    };

    let csv_text = match fs::read_to_string(csv_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {}: {}", csv_path, e);
            std::process::exit(1);
        }
    };
    let source = match source_from_csv(&csv_text) {
        Some(s) => s,
        None => {
            eprintln!("Error: {} has no header row", csv_path);
            std::process::exit(1);
        }
    };

    let mapping_text = match fs::read_to_string(mapping_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {}: {}", mapping_path, e);
            std::process::exit(1);
        }
    };
    let aliases = match AliasTable::from_json(&mapping_text) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error in {}: {}", mapping_path, e);
            std::process::exit(1);
        }
    };

    let layout = TemplateLayout::default();

    // Report first, so mapping problems are visible even if the write fails.
    let report = match resolve_template(&template, &layout, &aliases, &source, ScanLimits::default())
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error resolving columns: {}", e);
            std::process::exit(1);
        }
    };
    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            std::process::exit(1);
        }
    };
    io::stdout().write_all(json.as_bytes()).unwrap();
    println!();

    let unmatched = report.unmatched_labels();
    if !unmatched.is_empty() {
        eprintln!("Unmatched columns: {}", unmatched.join(", "));
    }
    eprintln!(
        "Matched {} of {} columns",
        report.matched_count(),
        report.columns.len()
    );

    let output = match fill(&template, &layout, &aliases, &source, ScanLimits::default()) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error filling template: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = fs::write(output_path, &output.workbook) {
        eprintln!("Error writing {}: {}", output_path, e);
        std::process::exit(1);
    }
    eprintln!("Written: {}", output_path);
}

/// Parse a CSV text (RFC 4180 quoting, LF or CRLF) into the source table.
///
/// Row 1 is the header row. Returns `None` for empty input.
fn source_from_csv(text: &str) -> Option<SourceTable> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    if rows.is_empty() {
        return None;
    }
    let headers = rows.remove(0);
    Some(SourceTable::from_rows(headers, &rows))
}
