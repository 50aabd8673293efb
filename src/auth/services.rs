use std::time::Duration;

use rand::RngCore;
use sqlx::PgPool;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::{JwtKeys, TokenPair},
    password::{hash_password, verify_password},
    repo_types::{NewUser, User},
};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Please confirm your email address before logging in")]
    EmailNotConfirmed,
    #[error("Invalid confirmation token")]
    InvalidConfirmationToken,
    #[error("Confirmation token has expired")]
    ConfirmationTokenExpired,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::EmailTaken | AuthError::UsernameTaken => AppError::Conflict(e.to_string()),
            AuthError::EmailNotConfirmed => AppError::Forbidden(e.to_string()),
            AuthError::InvalidConfirmationToken | AuthError::ConfirmationTokenExpired => {
                AppError::BadRequest(e.to_string())
            }
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::UserNotFound => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_confirmation_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn confirmation_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/api/auth/confirm-email?token={}",
        base_url.trim_end_matches('/'),
        token
    )
}

/// `req` must already be normalized and validated.
pub async fn register(state: &AppState, req: &RegisterRequest) -> Result<User, AuthError> {
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AuthError::EmailTaken);
    }
    if User::find_by_username(&state.db, &req.username)
        .await?
        .is_some()
    {
        warn!(username = %req.username, "username already taken");
        return Err(AuthError::UsernameTaken);
    }

    let hash = hash_password(&req.password)?;
    let token = generate_confirmation_token();
    let expiry =
        OffsetDateTime::now_utc() + TimeDuration::hours(state.config.auth.confirmation_ttl_hours);

    let new = NewUser {
        username: &req.username,
        email: &req.email,
        password_hash: &hash,
        confirmation_token: &token,
        confirmation_expiry: expiry,
    };
    let user = match User::create(&state.db, &new).await {
        Ok(u) => u,
        // Lost a race with a concurrent registration.
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(conflict_for_constraint(db.constraint()));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("create user").into()),
    };

    dispatch_confirmation(state, &user, token);
    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Logs the confirmation link in place of sending mail. With auto-confirm
/// enabled the account is confirmed after the configured delay.
fn dispatch_confirmation(state: &AppState, user: &User, token: String) {
    let link = confirmation_link(&state.config.auth.base_url, &token);
    info!(email = %user.email, username = %user.username, %link, "email confirmation issued");

    if !state.config.auth.auto_confirm {
        return;
    }
    let db = state.db.clone();
    let delay = Duration::from_secs(state.config.auth.auto_confirm_delay_secs);
    let user_id = user.id;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match confirm_email(&db, &token).await {
            Ok(_) => info!(user_id, "email auto-confirmed"),
            Err(e) => error!(user_id, error = %e, "auto-confirm failed"),
        }
    });
}

fn check_confirmation_expiry(user: &User, now: OffsetDateTime) -> Result<(), AuthError> {
    if user
        .email_confirmation_token_expiry
        .is_some_and(|expiry| expiry < now)
    {
        warn!(user_id = user.id, "confirmation token expired");
        return Err(AuthError::ConfirmationTokenExpired);
    }
    Ok(())
}

/// Password is checked before confirmation state.
fn check_login(user: &User, password: &str) -> Result<(), AuthError> {
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_email_confirmed {
        warn!(user_id = user.id, "login before email confirmation");
        return Err(AuthError::EmailNotConfirmed);
    }
    Ok(())
}

/// Maps a unique violation on `users` to the field that collided.
fn conflict_for_constraint(constraint: Option<&str>) -> AuthError {
    match constraint {
        Some(c) if c.contains("username") => AuthError::UsernameTaken,
        _ => AuthError::EmailTaken,
    }
}

pub async fn confirm_email(db: &PgPool, token: &str) -> Result<User, AuthError> {
    let user = User::find_by_confirmation_token(db, token)
        .await?
        .ok_or(AuthError::InvalidConfirmationToken)?;

    check_confirmation_expiry(&user, OffsetDateTime::now_utc())?;

    let user = User::mark_confirmed(db, user.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    info!(user_id = user.id, "email confirmed");
    Ok(user)
}

/// `req.email` must already be trimmed and lowercased.
pub async fn login(state: &AppState, req: &LoginRequest) -> Result<(User, TokenPair), AuthError> {
    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        warn!(email = %req.email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    check_login(&user, &req.password)?;

    let keys = JwtKeys::from(&state.config.jwt);
    let pair = keys.issue_pair(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok((user, pair))
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
    let keys = JwtKeys::from(&state.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AuthError::InvalidToken
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    let pair = keys.issue_pair(user.id)?;
    Ok((user, pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use axum::http::StatusCode;

    fn user(password: &str, confirmed: bool) -> User {
        User {
            id: 5,
            username: "cellar".into(),
            email: "cellar@domaine.fr".into(),
            password_hash: hash_password(password).unwrap(),
            is_email_confirmed: confirmed,
            email_confirmation_token_expiry: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn expired_confirmation_token_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let mut u = user("secret1", false);
        u.email_confirmation_token_expiry = Some(now - TimeDuration::minutes(1));
        let err = check_confirmation_expiry(&u, now).unwrap_err();
        assert!(matches!(err, AuthError::ConfirmationTokenExpired));
        assert_eq!(err.to_string(), "Confirmation token has expired");

        u.email_confirmation_token_expiry = Some(now + TimeDuration::hours(24));
        assert!(check_confirmation_expiry(&u, now).is_ok());
    }

    #[test]
    fn login_requires_password_then_confirmation() {
        let unconfirmed = user("secret1", false);
        let err = check_login(&unconfirmed, "wrong-one").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = check_login(&unconfirmed, "secret1").unwrap_err();
        assert_eq!(AppError::from(err).status(), StatusCode::FORBIDDEN);

        assert!(check_login(&user("secret1", true), "secret1").is_ok());
    }

    #[test]
    fn unique_violations_map_to_conflicts() {
        let username = conflict_for_constraint(Some("users_username_key"));
        assert!(matches!(username, AuthError::UsernameTaken));
        assert_eq!(AppError::from(username).status(), StatusCode::CONFLICT);

        let email = conflict_for_constraint(Some("users_email_key"));
        assert_eq!(email.to_string(), "Email already registered");
        assert!(matches!(conflict_for_constraint(None), AuthError::EmailTaken));
    }

    #[test]
    fn confirmation_token_is_64_hex_chars() {
        let token = generate_confirmation_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_confirmation_token());
    }

    #[test]
    fn confirmation_link_points_at_the_api() {
        assert_eq!(
            confirmation_link("http://localhost:8080/", "abc"),
            "http://localhost:8080/api/auth/confirm-email?token=abc"
        );
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::EmailTaken, StatusCode::CONFLICT),
            (AuthError::UsernameTaken, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::EmailNotConfirmed, StatusCode::FORBIDDEN),
            (AuthError::ConfirmationTokenExpired, StatusCode::BAD_REQUEST),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }
}
