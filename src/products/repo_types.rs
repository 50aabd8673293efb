use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::validation::{check_name, double_option, Validate, ValidationErrors};

/// A stored wine product.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub brand: Option<String>,
    pub net_volume: Option<String>,
    pub vintage: Option<String>,
    pub wine_type: Option<String>,
    pub sugar_content: Option<String>,
    pub appellation: Option<String>,
    pub alcohol_content: Option<String>,
    pub packaging_gases: Option<String>,
    pub portion_size: Option<String>,
    pub kcal: Option<String>,
    pub kj: Option<String>,
    pub fat: Option<String>,
    pub carbohydrates: Option<String>,
    pub organic: Option<bool>,
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub operator_type: Option<String>,
    pub operator_name: Option<String>,
    pub operator_address: Option<String>,
    pub operator_info: Option<String>,
    pub country_of_origin: Option<String>,
    pub sku: Option<String>,
    pub ean: Option<String>,
    pub external_link: Option<String>,
    pub redirect_link: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub created_by: Option<i32>,
}

/// Insert payload. Everything but `name` may be left out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub name: String,
    pub brand: Option<String>,
    pub net_volume: Option<String>,
    pub vintage: Option<String>,
    pub wine_type: Option<String>,
    pub sugar_content: Option<String>,
    pub appellation: Option<String>,
    pub alcohol_content: Option<String>,
    pub packaging_gases: Option<String>,
    pub portion_size: Option<String>,
    pub kcal: Option<String>,
    pub kj: Option<String>,
    pub fat: Option<String>,
    pub carbohydrates: Option<String>,
    pub organic: Option<bool>,
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub operator_type: Option<String>,
    pub operator_name: Option<String>,
    pub operator_address: Option<String>,
    pub operator_info: Option<String>,
    pub country_of_origin: Option<String>,
    pub sku: Option<String>,
    pub ean: Option<String>,
    pub external_link: Option<String>,
    pub redirect_link: Option<String>,
    pub image_url: Option<String>,
}

impl NewProduct {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, &self.name);
        errors.into_result()
    }
}

/// Partial update. An absent field is left alone, an explicit `null`
/// clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub net_volume: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub vintage: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub wine_type: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub sugar_content: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub appellation: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub alcohol_content: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub packaging_gases: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub portion_size: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub kcal: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub kj: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub fat: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub carbohydrates: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub organic: Option<Option<bool>>,
    #[serde(deserialize_with = "double_option")]
    pub vegetarian: Option<Option<bool>>,
    #[serde(deserialize_with = "double_option")]
    pub vegan: Option<Option<bool>>,
    #[serde(deserialize_with = "double_option")]
    pub operator_type: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub operator_name: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub operator_address: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub operator_info: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub country_of_origin: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub sku: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub ean: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub external_link: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub redirect_link: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

impl ProductPatch {
    pub fn normalize(&mut self) {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
    }
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        errors.into_result()
    }
}

#[cfg(test)]
impl Product {
    pub fn sample(id: i32, name: &str) -> Self {
        Product {
            id,
            name: name.into(),
            brand: None,
            net_volume: None,
            vintage: None,
            wine_type: None,
            sugar_content: None,
            appellation: None,
            alcohol_content: None,
            packaging_gases: None,
            portion_size: None,
            kcal: None,
            kj: None,
            fat: None,
            carbohydrates: None,
            organic: Some(false),
            vegetarian: Some(false),
            vegan: Some(false),
            operator_type: None,
            operator_name: None,
            operator_address: None,
            operator_info: None,
            country_of_origin: None,
            sku: None,
            ean: None,
            external_link: None,
            redirect_link: None,
            image_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            created_by: None,
        }
    }
}
