//! Minimal styles.xml parsing: date format detection
//!
//! The inspector only cares about one aspect of a cell's style, whether its
//! number format is a date/time format. Numeric cells carrying such a format
//! are surfaced as `CellValue::DateTime` instead of a raw serial number.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Parse `xl/styles.xml` into a per-`cellXfs`-entry date flag.
///
/// A cell's `s` attribute indexes into this table. Index 0 (the default
/// format) is never a date format in practice, but the table is built from
/// the file rather than assumed.
pub(crate) fn read_date_styles<R: Read>(file: R) -> XlsxResult<Vec<bool>> {
    let reader = BufReader::new(file);
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut numfmts: HashMap<u32, String> = HashMap::new();
    let mut cell_xf_numfmt_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id: Option<u32> = None;
                    let mut code: Option<String> = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr.unescape_value().ok().and_then(|s| s.parse().ok());
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(code)) = (id, code) {
                        numfmts.insert(id, code);
                    }
                }
                b"cellXfs" => {
                    in_cell_xfs = true;
                }
                b"xf" if in_cell_xfs => {
                    let mut numfmt_id = 0u32;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            numfmt_id = attr
                                .unescape_value()
                                .ok()
                                .and_then(|s| s.parse().ok())
                                .unwrap_or(0);
                        }
                    }
                    cell_xf_numfmt_ids.push(numfmt_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cell_xf_numfmt_ids
        .iter()
        .map(|&id| {
            is_builtin_date_format(id)
                || numfmts
                    .get(&id)
                    .map(|code| is_date_format_code(code))
                    .unwrap_or(false)
        })
        .collect())
}

/// Built-in number format ids that render as dates or times.
///
/// Ids 14-22 are the standard date/time formats, 27-36 the East Asian era
/// formats, 45-47 the duration formats, 50-58 more East Asian variants.
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Scan a custom format code for date/time tokens.
///
/// Literal sections (quoted strings, backslash escapes) and bracketed
/// sections (colors, conditions) are skipped, except elapsed-time brackets
/// such as `[h]`, `[mm]`, `[ss]` which count as time formats.
fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                // Quoted literal: skip until the closing quote
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' => {
                // Escaped literal character
                chars.next();
            }
            '[' => {
                let mut section = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    section.push(c);
                }
                if section
                    .chars()
                    .next()
                    .map(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
                    .unwrap_or(false)
                {
                    return true;
                }
            }
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' => return true,
            _ => {}
        }
    }

    false
}
