use std::{collections::HashMap, io::Cursor};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use super::SpreadsheetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Workbook,
    Csv,
}

/// Picks a reader from the file extension, falling back to the declared
/// content type when the name says nothing useful.
pub fn detect_format(file_name: Option<&str>, content_type: Option<&str>) -> Option<Format> {
    let ext = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => return Some(Format::Workbook),
        Some("csv") => return Some(Format::Csv),
        _ => {}
    }

    let mime = content_type?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel"
        | "application/vnd.oasis.opendocument.spreadsheet" => Some(Format::Workbook),
        "text/csv" | "application/csv" | "text/plain" => Some(Format::Csv),
        _ => None,
    }
}

/// Lowercases and drops spaces, underscores and hyphens, so `Net Volume`,
/// `NET_VOLUME` and `netVolume` compare equal.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
struct SheetRow {
    number: usize,
    cells: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    columns: HashMap<String, usize>,
    rows: Vec<SheetRow>,
}

impl Sheet {
    /// The first non-blank row becomes the header; blank data rows are dropped.
    /// Data rows are numbered from 2 in the order they remain.
    fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        let mut rows = rows
            .into_iter()
            .filter(|cells| cells.iter().any(Option::is_some));

        let Some(header) = rows.next() else {
            return Self::default();
        };

        let mut columns = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            if let Some(name) = name {
                columns.entry(normalize_header(name)).or_insert(idx);
            }
        }

        let rows = rows
            .enumerate()
            .map(|(idx, cells)| SheetRow {
                number: idx + 2,
                cells,
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |row| RowView { sheet: self, row })
    }

    fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.columns.get(&normalize_header(alias)).copied())
    }
}

/// One data row, addressed by header alias.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    sheet: &'a Sheet,
    row: &'a SheetRow,
}

impl<'a> RowView<'a> {
    /// 1-based row number, counting the header as row 1 and skipping blank rows.
    pub fn number(&self) -> usize {
        self.row.number
    }

    /// Text of the first alias that names a column, if that cell is non-blank.
    pub fn get(&self, aliases: &[&str]) -> Option<&'a str> {
        let idx = self.sheet.column(aliases)?;
        self.row.cells.get(idx)?.as_deref()
    }

    pub fn get_owned(&self, aliases: &[&str]) -> Option<String> {
        self.get(aliases).map(str::to_string)
    }
}

pub fn read_sheet(
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Sheet, SpreadsheetError> {
    let format = detect_format(file_name, content_type).ok_or_else(|| {
        SpreadsheetError::Unsupported {
            file_name: file_name.unwrap_or("<unnamed>").to_string(),
            content_type: content_type.unwrap_or("<none>").to_string(),
        }
    })?;

    let sheet = match format {
        Format::Workbook => read_workbook(bytes)?,
        Format::Csv => read_csv(bytes)?,
    };
    debug!(?format, rows = sheet.len(), columns = sheet.columns.len(), "sheet parsed");
    Ok(sheet)
}

fn read_workbook(bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoWorksheet)?;
    let range = workbook.worksheet_range(&first)?;

    let rows = range
        .rows()
        .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>());
    Ok(Sheet::from_rows(rows))
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(text).collect());
    }
    Ok(Sheet::from_rows(rows))
}

fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => text(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => text(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("Net Volume"), "netvolume");
        assert_eq!(normalize_header("NET_VOLUME"), "netvolume");
        assert_eq!(normalize_header("netVolume"), "netvolume");
        assert_eq!(normalize_header(" e-number "), "enumber");
    }

    #[test]
    fn format_from_extension_then_mime() {
        assert_eq!(detect_format(Some("Products.XLSX"), None), Some(Format::Workbook));
        assert_eq!(detect_format(Some("list.ods"), None), Some(Format::Workbook));
        assert_eq!(
            detect_format(Some("list.csv"), Some("application/octet-stream")),
            Some(Format::Csv)
        );
        assert_eq!(
            detect_format(Some("blob"), Some("text/csv; charset=utf-8")),
            Some(Format::Csv)
        );
        assert_eq!(detect_format(Some("photo.png"), Some("image/png")), None);
        assert_eq!(detect_format(None, Some("application/octet-stream")), None);
    }

    #[test]
    fn blank_rows_do_not_count_towards_row_numbers() {
        let csv = "\u{feff}Name,SKU\nRiesling,R-1\n,,\n  ,  \nMerlot,\n";
        let sheet = read_sheet(Some("wines.csv"), None, csv.as_bytes()).unwrap();
        let rows: Vec<_> = sheet.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number(), 2);
        assert_eq!(rows[0].get(&["name"]), Some("Riesling"));
        assert_eq!(rows[0].get(&["sku"]), Some("R-1"));
        assert_eq!(rows[1].number(), 3);
        assert_eq!(rows[1].get(&["name"]), Some("Merlot"));
        assert_eq!(rows[1].get(&["sku"]), None);
    }

    #[test]
    fn first_alias_with_a_column_wins() {
        let csv = "Type,Vintage\nRed,2019\n";
        let sheet = read_sheet(Some("w.csv"), None, csv.as_bytes()).unwrap();
        let row = sheet.rows().next().unwrap();
        assert_eq!(row.get(&["wine type", "type"]), Some("Red"));
        assert_eq!(row.get(&["missing"]), None);
    }

    #[test]
    fn duplicate_headers_keep_the_first_column() {
        let csv = "Name,name\nfirst,second\n";
        let sheet = read_sheet(Some("w.csv"), None, csv.as_bytes()).unwrap();
        assert_eq!(sheet.rows().next().unwrap().get(&["NAME"]), Some("first"));
    }

    #[test]
    fn empty_upload_has_no_rows() {
        let sheet = read_sheet(Some("w.csv"), None, b"").unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn numeric_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(2019.0)), Some("2019".into()));
        assert_eq!(cell_text(&Data::Float(12.5)), Some("12.5".into()));
        assert_eq!(cell_text(&Data::Int(750)), Some("750".into()));
        assert_eq!(cell_text(&Data::Bool(true)), Some("true".into()));
        assert_eq!(cell_text(&Data::String("  ".into())), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn unsupported_upload_is_rejected() {
        let err = read_sheet(Some("notes.txt"), Some("application/pdf"), b"x").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Unsupported { .. }));
        assert!(err.to_string().contains("notes.txt"));
    }
}
