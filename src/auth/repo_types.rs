use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub is_email_confirmed: bool,
    #[serde(skip_serializing)]
    pub email_confirmation_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields written when a user registers.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub confirmation_token: &'a str,
    pub confirmation_expiry: OffsetDateTime,
}
