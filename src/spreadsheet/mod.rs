//! Spreadsheet reading and writing for bulk import/export.
//!
//! Uploads are reduced to a [`Sheet`]: a header row plus numbered data rows
//! whose cells are already rendered as trimmed text. Downloads are always a
//! single-worksheet `.xlsx`.

mod reader;
mod writer;

use thiserror::Error;

pub use reader::{read_sheet, RowView, Sheet};
pub use writer::{write_sheet, XLSX_CONTENT_TYPE};

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Not an Excel/CSV file! Received: {content_type} with name {file_name}. Please upload only Excel or CSV files.")]
    Unsupported {
        file_name: String,
        content_type: String,
    },

    #[error("The uploaded workbook has no worksheets")]
    NoWorksheet,

    #[error("Could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}
