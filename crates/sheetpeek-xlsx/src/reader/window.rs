//! Bounded, lazy row windows over a sheet part

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::datetime::serial_to_datetime;
use crate::error::{XlsxError, XlsxResult};
use crate::reader::decode_excel_escapes;
use sheetpeek_core::{CellAddress, CellError, CellValue};

/// A finite, single-pass iterator over the first `max_rows` rows of a sheet.
///
/// Each item is a row of exactly `max_cols` values; gaps in the sheet (sparse
/// rows, missing cells, rows past the sheet's extent) come out as
/// `CellValue::Empty`. The sheet XML is decompressed and parsed as the
/// iterator advances, and parsing stops as soon as the window is filled.
pub struct RowWindow<'a> {
    xml: Reader<Box<dyn BufRead + 'a>>,
    shared_strings: &'a [String],
    date_styles: &'a [bool],
    max_rows: u32,
    max_cols: u16,
    /// Next 1-based row index to emit
    next_row: u32,
    /// A parsed source row waiting its turn (gap rows emit first)
    pending: Option<(u32, Vec<CellValue>)>,
    /// Highest 1-based source row seen, for rows lacking an `r` attribute
    last_source_row: u32,
    source_done: bool,
}

impl std::fmt::Debug for RowWindow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowWindow")
            .field("max_rows", &self.max_rows)
            .field("max_cols", &self.max_cols)
            .field("next_row", &self.next_row)
            .field("last_source_row", &self.last_source_row)
            .field("source_done", &self.source_done)
            .finish_non_exhaustive()
    }
}

impl<'a> RowWindow<'a> {
    pub(crate) fn new(
        xml: Reader<Box<dyn BufRead + 'a>>,
        shared_strings: &'a [String],
        date_styles: &'a [bool],
        max_rows: u32,
        max_cols: u16,
    ) -> Self {
        Self {
            xml,
            shared_strings,
            date_styles,
            max_rows,
            max_cols,
            next_row: 1,
            pending: None,
            last_source_row: 0,
            source_done: false,
        }
    }

    fn empty_row(&self) -> Vec<CellValue> {
        vec![CellValue::Empty; self.max_cols as usize]
    }

    /// Parse the next `<row>` element from the sheet XML.
    ///
    /// Returns the 1-based row number and its padded cell values, or `None`
    /// at the end of the sheet data.
    fn read_source_row(&mut self) -> XlsxResult<Option<(u32, Vec<CellValue>)>> {
        let mut buf = Vec::new();

        loop {
            match self.xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == b"row" => {
                    let row_num = row_number(&e).unwrap_or(self.last_source_row + 1);
                    self.last_source_row = row_num;
                    let cells = self.read_row_cells()?;
                    return Ok(Some((row_num, cells)));
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                    // Self-closing <row/> carries no cells
                    let row_num = row_number(&e).unwrap_or(self.last_source_row + 1);
                    self.last_source_row = row_num;
                    return Ok(Some((row_num, self.empty_row())));
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"sheetData" => return Ok(None),
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Consume events up to the matching `</row>`, collecting cell values
    /// into a window-width vector.
    fn read_row_cells(&mut self) -> XlsxResult<Vec<CellValue>> {
        let mut cells = self.empty_row();
        let mut buf = Vec::new();

        // Current cell state
        let mut current_col: Option<u16> = None;
        let mut current_type: Option<String> = None;
        let mut current_style: Option<u32> = None;
        let mut current_value: Option<String> = None;
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;
        // Cells without an `r` attribute follow their predecessor
        let mut next_implicit_col: u16 = 0;

        loop {
            match self.xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => {
                        let (col, cell_type, style) = parse_cell_attrs(&e, next_implicit_col)?;
                        in_cell = true;
                        current_col = Some(col);
                        current_type = cell_type;
                        current_style = style;
                        current_value = None;
                    }
                    b"v" if in_cell => {
                        in_value = true;
                    }
                    b"is" if in_cell => {
                        in_inline_str = true;
                    }
                    b"t" if in_inline_str => {
                        in_inline_text = true;
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                    // Empty cell element (may still carry a style); value stays Empty
                    let (col, _, _) = parse_cell_attrs(&e, next_implicit_col)?;
                    next_implicit_col = col.saturating_add(1);
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"row" => break,
                    b"c" => {
                        if let Some(col) = current_col.take() {
                            next_implicit_col = col.saturating_add(1);
                            if (col as usize) < cells.len() {
                                cells[col as usize] = self.convert_cell(
                                    current_type.as_deref(),
                                    current_value.as_deref(),
                                    current_style,
                                )?;
                            }
                        }
                        in_cell = false;
                        current_value = None;
                    }
                    b"v" => {
                        in_value = false;
                    }
                    b"is" => {
                        in_inline_str = false;
                    }
                    b"t" if in_inline_str => {
                        in_inline_text = false;
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_value {
                        if let Ok(text) = e.unescape() {
                            current_value = Some(text.to_string());
                        }
                    } else if in_inline_text {
                        if let Ok(text) = e.unescape() {
                            // Inline strings may split across rich text runs
                            current_value
                                .get_or_insert_with(String::new)
                                .push_str(&text);
                            current_type = Some("inlineStr".to_string());
                        }
                    }
                    // Text inside <f> (formula source) is deliberately not
                    // captured; only the cached <v> value matters here
                }
                Ok(Event::Eof) => break, // truncated part, keep what we have
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(cells)
    }

    /// Convert a raw cell (type attribute + `<v>` text) into a value
    fn convert_cell(
        &self,
        cell_type: Option<&str>,
        value: Option<&str>,
        style: Option<u32>,
    ) -> XlsxResult<CellValue> {
        let value = match value {
            Some(v) => v,
            None => return Ok(CellValue::Empty),
        };

        let cell_value = match cell_type {
            // Shared string
            Some("s") => {
                let idx: usize = value.parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                let s = self.shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }

            // Boolean
            Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

            // Error
            Some("e") => CellError::from_str(value)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::String(value.to_string())),

            // Inline or explicit string - decode Excel escape sequences
            Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(value)),

            // Number (default type or explicit "n"); date-formatted numbers
            // surface as DateTime
            None | Some("n") => match value.parse::<f64>() {
                Ok(n) if self.is_date_style(style) => serial_to_datetime(n)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(n)),
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::String(value.to_string()),
            },

            // Unknown type - treat as string
            Some(_) => CellValue::String(value.to_string()),
        };

        Ok(cell_value)
    }

    fn is_date_style(&self, style: Option<u32>) -> bool {
        style
            .and_then(|s| self.date_styles.get(s as usize))
            .copied()
            .unwrap_or(false)
    }
}

impl Iterator for RowWindow<'_> {
    type Item = XlsxResult<Vec<CellValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.max_rows {
            return None;
        }

        loop {
            // A parked source row: emit gap rows until its turn comes up
            if let Some((row_num, cells)) = self.pending.take() {
                if row_num > self.next_row {
                    self.pending = Some((row_num, cells));
                    self.next_row += 1;
                    return Some(Ok(self.empty_row()));
                }
                self.next_row += 1;
                return Some(Ok(cells));
            }

            if self.source_done {
                self.next_row += 1;
                return Some(Ok(self.empty_row()));
            }

            match self.read_source_row() {
                Ok(Some((row_num, cells))) => {
                    if row_num > self.max_rows {
                        // Past the window, stop parsing the part
                        self.source_done = true;
                    } else if row_num >= self.next_row {
                        self.pending = Some((row_num, cells));
                    }
                    // Rows numbered behind the cursor are out of order; skip
                }
                Ok(None) => {
                    self.source_done = true;
                }
                Err(e) => {
                    self.next_row = self.max_rows.saturating_add(1); // fuse
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Extract the 1-based `r` attribute of a `<row>` element
fn row_number(e: &BytesStart) -> Option<u32> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            return attr.unescape_value().ok().and_then(|s| s.parse().ok());
        }
    }
    None
}

/// Parse the attributes of a `<c>` element into (column, type, style index).
///
/// `fallback_col` is used when the cell has no `r` reference.
fn parse_cell_attrs(
    e: &BytesStart,
    fallback_col: u16,
) -> XlsxResult<(u16, Option<String>, Option<u32>)> {
    let mut col = fallback_col;
    let mut cell_type = None;
    let mut style = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                if let Ok(v) = attr.unescape_value() {
                    col = CellAddress::parse(&v)?.col;
                }
            }
            b"t" => {
                cell_type = attr.unescape_value().ok().map(|s| s.to_string());
            }
            b"s" => {
                style = attr.unescape_value().ok().and_then(|s| s.parse::<u32>().ok());
            }
            _ => {}
        }
    }

    Ok((col, cell_type, style))
}
