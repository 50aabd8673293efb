use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::{JwtKeys, TokenKind};
use crate::error::AppError;

/// Extracts and validates an access token, returning the user ID.
pub struct AuthUser(pub i32);

/// Like [`AuthUser`], but a request without an `Authorization` header passes
/// through as `None`. A header carrying a bad token is still rejected.
pub struct MaybeAuthUser(pub Option<i32>);

fn bearer_user(parts: &Parts, keys: &JwtKeys) -> Result<Option<i32>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    // Expect "Bearer <token>"
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let claims = keys.verify(token.trim()).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("Access token required".into()));
    }
    Ok(Some(claims.sub))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        bearer_user(parts, &keys)?
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        bearer_user(parts, &keys).map(MaybeAuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/api/auth/me");
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_access_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(9).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(id, 9);
    }

    #[tokio::test]
    async fn rejects_refresh_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_refresh(9).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Access token required"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized_but_optional_passes() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_err());
        let MaybeAuthUser(id) = MaybeAuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn optional_still_rejects_garbage() {
        let state = AppState::fake();
        let mut parts = parts_with(Some("Bearer nope"));
        assert!(MaybeAuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
        let mut parts = parts_with(Some("Basic dXNlcjpwdw=="));
        assert!(MaybeAuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }
}
