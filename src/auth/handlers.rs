use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ConfirmEmailQuery, LoginRequest, PublicUser, RefreshRequest,
            RegisterRequest,
        },
        extractors::AuthUser,
        repo_types::User,
        services,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
    validation::Validate,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/confirm-email", get(confirm_email))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.normalize();
    payload.validate().map_err(|details| {
        warn!(email = %payload.email, "invalid registration");
        AppError::invalid("Invalid registration data", details)
    })?;

    let user = services::register(&state, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: Some(
                "Registration successful! Please check your email to confirm your account.".into(),
            ),
            token: None,
            refresh_token: None,
            user: Some(user.into()),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    payload
        .validate()
        .map_err(|details| AppError::invalid("Invalid login data", details))?;

    let (user, pair) = services::login(&state, &payload).await?;

    Ok(Json(AuthResponse {
        success: true,
        message: Some("Login successful".into()),
        token: Some(pair.access_token),
        refresh_token: Some(pair.refresh_token),
        user: Some(user.into()),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, pair) = services::refresh(&state, &payload.refresh_token).await?;

    Ok(Json(AuthResponse {
        success: true,
        message: None,
        token: Some(pair.access_token),
        refresh_token: Some(pair.refresh_token),
        user: Some(user.into()),
    }))
}

/// Target of the emailed link; lands the browser back on the client.
#[instrument(skip(state, query))]
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> AppResult<Redirect> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Token is required".into()))?;

    match services::confirm_email(&state.db, token).await {
        Ok(_) => Ok(Redirect::to(&confirmation_redirect(None)?)),
        Err(services::AuthError::Internal(e)) => Err(AppError::Internal(e)),
        Err(e) => Ok(Redirect::to(&confirmation_redirect(Some(&e.to_string()))?)),
    }
}

/// Client location after a confirmation attempt.
fn confirmation_redirect(error: Option<&str>) -> AppResult<String> {
    let Some(message) = error else {
        return Ok("/?emailConfirmed=true".to_string());
    };
    let query = serde_urlencoded::to_string([("emailConfirmed", "false"), ("error", message)])
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(format!("/?{query}"))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}
