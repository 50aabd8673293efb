use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::validation::{check_name, double_option, Validate, ValidationErrors};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub e_number: Option<String>,
    pub allergens: Vec<String>,
    pub details: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub created_by: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewIngredient {
    pub name: String,
    pub category: Option<String>,
    pub e_number: Option<String>,
    pub allergens: Vec<String>,
    pub details: Option<String>,
}

impl NewIngredient {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.allergens = clean_allergens(std::mem::take(&mut self.allergens));
    }
}

impl Validate for NewIngredient {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, &self.name);
        errors.into_result()
    }
}

/// Partial update; `allergens: null` empties the list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngredientPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub e_number: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub allergens: Option<Option<Vec<String>>>,
    #[serde(deserialize_with = "double_option")]
    pub details: Option<Option<String>>,
}

impl IngredientPatch {
    pub fn normalize(&mut self) {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(allergens) = self.allergens.take() {
            self.allergens = Some(Some(clean_allergens(allergens.unwrap_or_default())));
        }
    }
}

impl Validate for IngredientPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        errors.into_result()
    }
}

/// Trims each entry and drops blanks.
pub fn clean_allergens<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|a| {
            let a = a.as_ref().trim();
            (!a.is_empty()).then(|| a.to_string())
        })
        .collect()
}

#[cfg(test)]
impl Ingredient {
    pub fn sample(id: i32, name: &str) -> Self {
        Ingredient {
            id,
            name: name.into(),
            category: None,
            e_number: None,
            allergens: Vec::new(),
            details: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            created_by: None,
        }
    }
}
