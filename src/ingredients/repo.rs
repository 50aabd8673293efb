use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::{Ingredient, IngredientPatch, NewIngredient};
use crate::db::assign;

const INGREDIENT_COLUMNS: &str =
    "id, name, category, e_number, allergens, details, created_at, updated_at, created_by";

impl Ingredient {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients ORDER BY id"
        ))
        .fetch_all(db)
        .await
        .context("list ingredients")?;
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: i32) -> anyhow::Result<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("get ingredient {id}"))?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        new: &NewIngredient,
        created_by: Option<i32>,
    ) -> anyhow::Result<Ingredient> {
        let row = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            INSERT INTO ingredients (name, category, e_number, allergens, details, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.e_number)
        .bind(&new.allergens)
        .bind(&new.details)
        .bind(created_by)
        .fetch_one(db)
        .await
        .context("insert ingredient")?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: i32,
        patch: IngredientPatch,
    ) -> anyhow::Result<Option<Ingredient>> {
        let mut qb = update_query(id, patch);
        let row = qb
            .build_query_as::<Ingredient>()
            .fetch_optional(db)
            .await
            .with_context(|| format!("update ingredient {id}"))?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: i32) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .with_context(|| format!("delete ingredient {id}"))?;
        Ok(res.rows_affected() > 0)
    }
}

fn update_query(id: i32, p: IngredientPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ingredients SET updated_at = now()");
    assign(&mut qb, "name", p.name);
    assign(&mut qb, "category", p.category);
    assign(&mut qb, "e_number", p.e_number);
    // Column is NOT NULL; a cleared list is stored empty.
    assign(&mut qb, "allergens", p.allergens.map(Option::unwrap_or_default));
    assign(&mut qb, "details", p.details);
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(INGREDIENT_COLUMNS);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_sets_present_fields() {
        let patch: IngredientPatch =
            serde_json::from_str(r#"{"category":null,"allergens":["egg"]}"#).unwrap();
        let qb = update_query(9, patch);
        assert_eq!(
            qb.sql(),
            format!(
                "UPDATE ingredients SET updated_at = now(), category = $1, allergens = $2 \
                 WHERE id = $3 RETURNING {INGREDIENT_COLUMNS}"
            )
        );
    }
}
