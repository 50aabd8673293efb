use std::future::Future;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    spreadsheet::{RowView, Sheet},
    validation::{Validate, ValidationErrors},
};

/// A record that can be built from one spreadsheet row.
pub trait FromSheetRow: Validate + Sized {
    /// `None` when the row has no name; such rows are never validated.
    fn from_row(row: &RowView<'_>) -> Option<Self>;
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("Name is required")]
    MissingName,
    #[error("{}", .0.joined())]
    Invalid(ValidationErrors),
    #[error("{0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug)]
pub struct ImportSummary<T> {
    pub imported: usize,
    pub errors: Vec<String>,
    pub records: Vec<T>,
}

impl<T> Default for ImportSummary<T> {
    fn default() -> Self {
        Self {
            imported: 0,
            errors: Vec::new(),
            records: Vec::new(),
        }
    }
}

impl<T: Serialize> ImportSummary<T> {
    /// `{success, imported, errors, <records_key>}`
    pub fn to_json(&self, records_key: &str) -> anyhow::Result<Value> {
        let records = serde_json::to_value(&self.records).context("serialize imported records")?;
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        body.insert("imported".into(), self.imported.into());
        body.insert("errors".into(), serde_json::json!(self.errors));
        body.insert(records_key.into(), records);
        Ok(Value::Object(body))
    }
}

/// Maps, validates and inserts every data row of `sheet`. A failing row is
/// recorded as `Row <n>: <reason>` and never stops the batch.
pub async fn import_rows<N, T, F, Fut>(sheet: &Sheet, mut insert: F) -> ImportSummary<T>
where
    N: FromSheetRow,
    F: FnMut(N) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut summary = ImportSummary::default();
    if sheet.is_empty() {
        info!("sheet has no data rows");
        return summary;
    }

    for row in sheet.rows() {
        match import_row(&row, &mut insert).await {
            Ok(record) => summary.records.push(record),
            Err(e) => {
                debug!(row = row.number(), error = %e, "row rejected");
                summary.errors.push(format!("Row {}: {}", row.number(), e));
            }
        }
    }
    summary.imported = summary.records.len();

    info!(
        rows = sheet.len(),
        imported = summary.imported,
        failed = summary.errors.len(),
        "import finished"
    );
    summary
}

async fn import_row<N, T, F, Fut>(row: &RowView<'_>, insert: &mut F) -> Result<T, RowError>
where
    N: FromSheetRow,
    F: FnMut(N) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let record = N::from_row(row).ok_or(RowError::MissingName)?;
    record.validate().map_err(RowError::Invalid)?;
    insert(record).await.map_err(RowError::Storage)
}
