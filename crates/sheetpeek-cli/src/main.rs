//! sheetpeek - workbook inspection tool
//!
//! Opens `OSSRequestForm-v4.xlsx` in the working directory and dumps the
//! sheet names plus the first rows of each sheet to stdout, for manual
//! inspection during development. Takes no arguments.
//!
//! Exit codes: 0 on success, 2 when the XLSX reading capability was compiled
//! out (`--no-default-features`), 1 on any other failure.

#[cfg(feature = "xlsx")]
use std::io::{self, Write};
#[cfg(feature = "xlsx")]
use std::path::Path;

/// Fixed input path, relative to the working directory
#[cfg(feature = "xlsx")]
const WORKBOOK_PATH: &str = "OSSRequestForm-v4.xlsx";

/// Rows 1-20 of each sheet are dumped
#[cfg(feature = "xlsx")]
const ROW_WINDOW: u32 = 20;

/// Columns A-H of each row are dumped
#[cfg(feature = "xlsx")]
const COL_WINDOW: u16 = 8;

#[cfg(feature = "xlsx")]
fn main() -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    dump_workbook(Path::new(WORKBOOK_PATH), &mut out)
}

#[cfg(not(feature = "xlsx"))]
fn main() {
    // The reading capability is absent from this build; report the sentinel
    // with its distinct exit code and touch nothing else.
    println!("MISSING_DEPENDENCY");
    std::process::exit(2);
}

/// Dump the sheet list and a bounded row window per sheet.
///
/// Sheets print in the workbook's stored order; each row prints as the Debug
/// rendering of exactly [`COL_WINDOW`] cell values.
#[cfg(feature = "xlsx")]
fn dump_workbook(path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    use anyhow::Context;
    use sheetpeek_xlsx::XlsxWorkbook;

    let mut workbook = XlsxWorkbook::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;

    let names: Vec<String> = workbook
        .sheet_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    writeln!(out, "SHEETS: {:?}", names)?;

    for name in &names {
        writeln!(out)?;
        writeln!(out, "--- SHEET: {}", name)?;

        let window = workbook
            .rows(name, ROW_WINDOW, COL_WINDOW)
            .with_context(|| format!("Failed to read sheet '{}'", name))?;
        for row in window {
            let row = row.with_context(|| format!("Failed to read sheet '{}'", name))?;
            writeln!(out, "{:?}", row)?;
        }
    }

    Ok(())
}

#[cfg(all(test, feature = "xlsx"))]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Minimal single-part-per-sheet XLSX fixture
    fn build_xlsx(sheets: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#).unwrap();

            let mut workbook_xml = String::from(
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
            );
            let mut rels_xml = String::from(
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            );
            for (i, (name, _)) in sheets.iter().enumerate() {
                workbook_xml.push_str(&format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                    name,
                    i + 1,
                    i + 1
                ));
                rels_xml.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                    i + 1,
                    i + 1
                ));
            }
            workbook_xml.push_str("</sheets></workbook>");
            rels_xml.push_str("</Relationships>");

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(workbook_xml.as_bytes()).unwrap();
            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(rels_xml.as_bytes()).unwrap();

            for (i, (_, sheet_data)) in sheets.iter().enumerate() {
                zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                    .unwrap();
                let xml = format!(
                    r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                    sheet_data
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }

    fn dump_to_string(path: &Path) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dump_workbook(path, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_dump_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.xlsx");
        std::fs::write(
            &path,
            build_xlsx(&[
                ("Form", r#"<row r="1"><c r="A1"><v>1</v></c></row>"#),
                ("Lookup", ""),
                ("Notes", ""),
            ]),
        )
        .unwrap();

        let output = dump_to_string(&path).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], r#"SHEETS: ["Form", "Lookup", "Notes"]"#);

        // Per sheet: one blank line, one separator, then the row window
        let expected_lines = 1 + 3 * (2 + ROW_WINDOW as usize);
        assert_eq!(lines.len(), expected_lines);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "--- SHEET: Form");
        assert!(lines[3].starts_with("[Number(1.0)"));

        // Every row line shows exactly COL_WINDOW values
        for line in lines.iter().skip(3).filter(|l| l.starts_with('[')) {
            assert_eq!(line.matches(", ").count() + 1, COL_WINDOW as usize);
        }
    }

    #[test]
    fn test_missing_file_produces_no_sheets_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.xlsx");

        let mut out = Vec::new();
        let err = dump_workbook(&path, &mut out).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_repeated_runs_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.xlsx");
        std::fs::write(
            &path,
            build_xlsx(&[(
                "Form",
                r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1" t="b"><v>1</v></c></row>"#,
            )]),
        )
        .unwrap();

        let first = dump_to_string(&path).unwrap();
        let second = dump_to_string(&path).unwrap();
        assert_eq!(first, second);
    }
}
