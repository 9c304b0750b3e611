//! # sheetpeek-xlsx
//!
//! XLSX (Office Open XML) reader for sheetpeek.
//!
//! The entry point is [`XlsxWorkbook`], which opens the ZIP container,
//! enumerates sheets in stored order, and hands out bounded, lazy row
//! windows over a sheet's cell values.

pub mod error;
pub mod reader;

mod datetime;
mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::{RowWindow, XlsxWorkbook};
