//! Row-by-row spreadsheet import and fixed-column export, shared by products
//! and ingredients.

mod export;
mod import;

pub use export::{export_xlsx, xlsx_download, SheetRecord};
pub use import::{import_rows, FromSheetRow};

pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;
