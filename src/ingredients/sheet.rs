use super::repo_types::{clean_allergens, Ingredient, NewIngredient};
use crate::{
    bulk::{FromSheetRow, SheetRecord},
    spreadsheet::RowView,
};

impl FromSheetRow for NewIngredient {
    fn from_row(row: &RowView<'_>) -> Option<Self> {
        Some(NewIngredient {
            name: row.get_owned(&["name"])?,
            category: row.get_owned(&["category"]),
            e_number: row.get_owned(&["e number"]),
            allergens: row
                .get(&["allergens"])
                .map(|cell| clean_allergens(cell.split(',')))
                .unwrap_or_default(),
            details: row.get_owned(&["details"]),
        })
    }
}

impl SheetRecord for Ingredient {
    const SHEET_NAME: &'static str = "Ingredients";
    const COLUMNS: &'static [&'static str] =
        &["Name", "Category", "E Number", "Allergens", "Details"];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.name.clone()),
            self.category.clone(),
            self.e_number.clone(),
            (!self.allergens.is_empty()).then(|| self.allergens.join(", ")),
            self.details.clone(),
        ]
    }
}
