use rust_xlsxwriter::{Format, Workbook};

use super::SpreadsheetError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Writes one worksheet with a bold header row. `None` cells stay empty.
pub fn write_sheet(
    sheet_name: &str,
    headers: &[&str],
    rows: &[Vec<Option<String>>],
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet.write_string(row_num, col as u16, value)?;
            }
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
