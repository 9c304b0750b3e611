//! # sheetpeek-core
//!
//! Core data types for the sheetpeek workbook inspector.
//!
//! This crate provides the fundamental types shared by the reading and CLI
//! layers:
//! - [`CellValue`] - Represents cell values (numbers, strings, booleans, dates, errors)
//! - [`CellAddress`] - A1-style cell addressing
//!
//! ## Example
//!
//! ```rust
//! use sheetpeek_core::{CellAddress, CellValue};
//!
//! let addr = CellAddress::parse("B7").unwrap();
//! assert_eq!((addr.row, addr.col), (6, 1));
//!
//! let value = CellValue::Number(3.14);
//! assert_eq!(value.to_string(), "3.14");
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{CellAddress, CellError, CellValue};
pub use error::{Error, Result};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
