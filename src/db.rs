use anyhow::Context;
use sqlx::{Encode, PgPool, Postgres, QueryBuilder, Type};

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// Appends `, <column> = $n` to an `UPDATE ... SET` that already has a first
/// assignment. `None` leaves the column untouched.
pub fn assign<'a, T>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: Option<T>)
where
    T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
{
    if let Some(value) = value {
        qb.push(", ").push(column).push(" = ").push_bind(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_skips_absent_and_binds_present() {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = now()");
        assign(&mut qb, "brand", Some(Some("Domaine".to_string())));
        assign::<Option<String>>(&mut qb, "vintage", None);
        assign(&mut qb, "sku", Some(None::<String>));
        qb.push(" WHERE id = ").push_bind(1_i32);
        assert_eq!(
            qb.sql(),
            "UPDATE products SET updated_at = now(), brand = $1, sku = $2 WHERE id = $3"
        );
    }
}
