//! XLSX workbook reader
//!
//! Opens the ZIP container once, resolves the sheet list (stored order) and
//! the shared parts, and hands out bounded row windows per sheet.

mod window;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::debug;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_date_styles;

pub use window::RowWindow;

/// An opened XLSX workbook.
///
/// Holds the ZIP archive handle for the lifetime of the value; sheet parts
/// are decompressed lazily, one streaming pass per [`rows`](Self::rows) call.
#[derive(Debug)]
pub struct XlsxWorkbook<R> {
    archive: zip::ZipArchive<R>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    date_styles: Vec<bool>,
}

/// A sheet as listed in `xl/workbook.xml`, with its part path resolved
/// through `xl/_rels/workbook.xml.rels`.
#[derive(Debug)]
struct SheetEntry {
    name: String,
    path: String,
}

impl XlsxWorkbook<BufReader<File>> {
    /// Open a workbook from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }
}

impl<R: Read + Seek> XlsxWorkbook<R> {
    /// Open a workbook from a reader
    pub fn read(reader: R) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX container
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        debug!("loaded {} shared strings", shared_strings.len());

        let date_styles = Self::read_styles(&mut archive)?;
        debug!("loaded {} cell formats", date_styles.len());

        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        // Keep the stored order from workbook.xml; drop sheets whose part
        // cannot be resolved (chartsheets and the like have no worksheet rel)
        let sheets: Vec<SheetEntry> = sheet_info
            .into_iter()
            .filter_map(|(name, r_id)| {
                sheet_paths.get(&r_id).map(|path| SheetEntry {
                    name,
                    path: path.clone(),
                })
            })
            .collect();
        debug!("workbook has {} sheets", sheets.len());

        Ok(Self {
            archive,
            sheets,
            shared_strings,
            date_styles,
        })
    }

    /// Sheet names in the workbook's stored order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of sheets in the workbook
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// A lazy, single-pass window over the first `max_rows` rows of a sheet,
    /// each exactly `max_cols` values wide.
    ///
    /// Missing cells and rows pad with `CellValue::Empty`; cells beyond the
    /// window are skipped without being materialized.
    pub fn rows(
        &mut self,
        sheet_name: &str,
        max_rows: u32,
        max_cols: u16,
    ) -> XlsxResult<RowWindow<'_>> {
        let Self {
            archive,
            sheets,
            shared_strings,
            date_styles,
        } = self;

        let entry = sheets
            .iter()
            .find(|s| s.name == sheet_name)
            .ok_or_else(|| XlsxError::SheetNotFound(sheet_name.to_string()))?;

        let file = archive
            .by_name(&entry.path)
            .map_err(|_| XlsxError::MissingPart(entry.path.clone()))?;

        let boxed: Box<dyn std::io::BufRead + '_> = Box::new(BufReader::new(file));
        let mut xml_reader = Reader::from_reader(boxed);
        xml_reader.trim_text(true);

        Ok(RowWindow::new(
            xml_reader,
            shared_strings,
            date_styles,
            max_rows,
            max_cols,
        ))
    }

    /// Read the shared strings table (optional part)
    fn read_shared_strings(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    // Rich text runs produce several <t> per <si>; their
                    // contents concatenate
                    b"t" if in_si => {
                        in_t = true;
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"t" => {
                        in_t = false;
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current_string.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read styles.xml into per-format date flags (optional part)
    fn read_styles(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<bool>> {
        let file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };
        read_date_styles(file)
    }

    /// Read workbook.xml to get sheet names and rIds, in stored order
    fn read_workbook_xml(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"r:id" => {
                                r_id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels(archive: &mut zip::ZipArchive<R>) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    // Only worksheet relationships matter here
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to the xl/ folder
                            let full_path = if let Some(stripped) = target.strip_prefix('/') {
                                stripped.to_string()
                            } else {
                                format!("xl/{}", target)
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel encodes characters that are invalid in XML this way:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        // A valid escape is exactly `_x` + 4 hex digits + `_`
        let decoded = if tail.len() >= 7
            && tail.as_bytes()[6] == b'_'
            && tail[2..6].bytes().all(|b| b.is_ascii_hexdigit())
        {
            u32::from_str_radix(&tail[2..6], 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &tail[7..];
            }
            None => {
                result.push_str("_x");
                rest = &tail[2..];
            }
        }
    }

    result.push_str(rest);
    result
}
