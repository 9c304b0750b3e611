//! Cell types: values and A1-style addressing

mod address;
mod value;

pub use address::CellAddress;
pub use value::{CellError, CellValue};
