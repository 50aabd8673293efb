use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::{NewProduct, Product, ProductPatch};
use crate::db::assign;

const PRODUCT_COLUMNS: &str = r#"
    id, name, brand, net_volume, vintage, wine_type, sugar_content, appellation,
    alcohol_content, packaging_gases, portion_size, kcal, kj, fat, carbohydrates,
    organic, vegetarian, vegan, operator_type, operator_name, operator_address,
    operator_info, country_of_origin, sku, ean, external_link, redirect_link,
    image_url, created_at, updated_at, created_by
"#;

impl Product {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(db)
        .await
        .context("list products")?;
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: i32) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("get product {id}"))?;
        Ok(row)
    }

    /// Insert a validated product; unset flags fall back to `false`.
    pub async fn create(
        db: &PgPool,
        new: &NewProduct,
        created_by: Option<i32>,
    ) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                name, brand, net_volume, vintage, wine_type, sugar_content, appellation,
                alcohol_content, packaging_gases, portion_size, kcal, kj, fat, carbohydrates,
                organic, vegetarian, vegan, operator_type, operator_name, operator_address,
                operator_info, country_of_origin, sku, ean, external_link, redirect_link,
                image_url, created_by
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                COALESCE($15, FALSE), COALESCE($16, FALSE), COALESCE($17, FALSE),
                $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28
            )
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.brand)
        .bind(&new.net_volume)
        .bind(&new.vintage)
        .bind(&new.wine_type)
        .bind(&new.sugar_content)
        .bind(&new.appellation)
        .bind(&new.alcohol_content)
        .bind(&new.packaging_gases)
        .bind(&new.portion_size)
        .bind(&new.kcal)
        .bind(&new.kj)
        .bind(&new.fat)
        .bind(&new.carbohydrates)
        .bind(new.organic)
        .bind(new.vegetarian)
        .bind(new.vegan)
        .bind(&new.operator_type)
        .bind(&new.operator_name)
        .bind(&new.operator_address)
        .bind(&new.operator_info)
        .bind(&new.country_of_origin)
        .bind(&new.sku)
        .bind(&new.ean)
        .bind(&new.external_link)
        .bind(&new.redirect_link)
        .bind(&new.image_url)
        .bind(created_by)
        .fetch_one(db)
        .await
        .context("insert product")?;
        Ok(row)
    }

    /// Apply a partial update. `None` when the product does not exist.
    pub async fn update(
        db: &PgPool,
        id: i32,
        patch: ProductPatch,
    ) -> anyhow::Result<Option<Product>> {
        let mut qb = update_query(id, patch);
        let row = qb
            .build_query_as::<Product>()
            .fetch_optional(db)
            .await
            .with_context(|| format!("update product {id}"))?;
        Ok(row)
    }

    /// `true` when a row was removed.
    pub async fn delete(db: &PgPool, id: i32) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .with_context(|| format!("delete product {id}"))?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_image_url(
        db: &PgPool,
        id: i32,
        image_url: Option<&str>,
    ) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
               SET image_url = $2, updated_at = now()
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(image_url)
        .fetch_optional(db)
        .await
        .with_context(|| format!("set image of product {id}"))?;
        Ok(row)
    }
}

fn update_query(id: i32, p: ProductPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE products SET updated_at = now()");
    assign(&mut qb, "name", p.name);
    assign(&mut qb, "brand", p.brand);
    assign(&mut qb, "net_volume", p.net_volume);
    assign(&mut qb, "vintage", p.vintage);
    assign(&mut qb, "wine_type", p.wine_type);
    assign(&mut qb, "sugar_content", p.sugar_content);
    assign(&mut qb, "appellation", p.appellation);
    assign(&mut qb, "alcohol_content", p.alcohol_content);
    assign(&mut qb, "packaging_gases", p.packaging_gases);
    assign(&mut qb, "portion_size", p.portion_size);
    assign(&mut qb, "kcal", p.kcal);
    assign(&mut qb, "kj", p.kj);
    assign(&mut qb, "fat", p.fat);
    assign(&mut qb, "carbohydrates", p.carbohydrates);
    assign(&mut qb, "organic", p.organic);
    assign(&mut qb, "vegetarian", p.vegetarian);
    assign(&mut qb, "vegan", p.vegan);
    assign(&mut qb, "operator_type", p.operator_type);
    assign(&mut qb, "operator_name", p.operator_name);
    assign(&mut qb, "operator_address", p.operator_address);
    assign(&mut qb, "operator_info", p.operator_info);
    assign(&mut qb, "country_of_origin", p.country_of_origin);
    assign(&mut qb, "sku", p.sku);
    assign(&mut qb, "ean", p.ean);
    assign(&mut qb, "external_link", p.external_link);
    assign(&mut qb, "redirect_link", p.redirect_link);
    assign(&mut qb, "image_url", p.image_url);
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(PRODUCT_COLUMNS);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_only_touches_updated_at() {
        let qb = update_query(3, ProductPatch::default());
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE products SET updated_at = now() WHERE id = $1 RETURNING"));
    }

    #[test]
    fn patch_binds_set_and_cleared_columns() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"name":"Syrah","sku":null,"organic":true}"#).unwrap();
        let qb = update_query(3, patch);
        assert!(qb.sql().starts_with(
            "UPDATE products SET updated_at = now(), name = $1, organic = $2, sku = $3 WHERE id = $4"
        ));
    }
}
