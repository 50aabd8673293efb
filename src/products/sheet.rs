use super::repo_types::{NewProduct, Product};
use crate::{
    bulk::{FromSheetRow, SheetRecord},
    spreadsheet::RowView,
};

impl FromSheetRow for NewProduct {
    fn from_row(row: &RowView<'_>) -> Option<Self> {
        Some(NewProduct {
            name: row.get_owned(&["name"])?,
            net_volume: row.get_owned(&["net volume"]),
            vintage: row.get_owned(&["vintage"]),
            wine_type: row.get_owned(&["wine type", "type"]),
            sugar_content: row.get_owned(&["sugar content"]),
            appellation: row.get_owned(&["appellation"]),
            sku: row.get_owned(&["sku"]),
            ..NewProduct::default()
        })
    }
}

impl SheetRecord for Product {
    const SHEET_NAME: &'static str = "Products";
    const COLUMNS: &'static [&'static str] = &[
        "Name",
        "Net Volume",
        "Vintage",
        "Type",
        "Sugar Content",
        "Appellation",
        "SKU",
    ];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.name.clone()),
            self.net_volume.clone(),
            self.vintage.clone(),
            self.wine_type.clone(),
            self.sugar_content.clone(),
            self.appellation.clone(),
            self.sku.clone(),
        ]
    }
}
