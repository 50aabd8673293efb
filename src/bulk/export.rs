use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::spreadsheet::{write_sheet, SpreadsheetError, XLSX_CONTENT_TYPE};

/// Projection of a stored record onto human-labelled export columns.
pub trait SheetRecord {
    const SHEET_NAME: &'static str;
    const COLUMNS: &'static [&'static str];

    /// One cell per entry of `COLUMNS`, in the same order.
    fn cells(&self) -> Vec<Option<String>>;
}

pub fn export_xlsx<R: SheetRecord>(records: &[R]) -> Result<Vec<u8>, SpreadsheetError> {
    let rows: Vec<_> = records.iter().map(SheetRecord::cells).collect();
    let bytes = write_sheet(R::SHEET_NAME, R::COLUMNS, &rows)?;
    info!(sheet = R::SHEET_NAME, rows = rows.len(), size = bytes.len(), "export written");
    Ok(bytes)
}

pub fn xlsx_download(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={file_name}"),
            ),
        ],
        bytes,
    )
        .into_response()
}
