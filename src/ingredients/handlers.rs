use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::repo_types::{Ingredient, IngredientPatch, NewIngredient};
use crate::{
    auth::MaybeAuthUser,
    bulk::{export_xlsx, import_rows, xlsx_download, MAX_IMPORT_BYTES},
    error::{AppError, AppResult},
    extract::{take_file, AppJson, AppMultipart, AppPath},
    spreadsheet::read_sheet,
    state::AppState,
    validation::Validate,
};

const NOT_FOUND: &str = "Ingredient not found";

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/ingredients/export", get(export_ingredients))
        .route(
            "/ingredients/import",
            post(import_ingredients).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route(
            "/ingredients/:id",
            get(get_ingredient).put(update_ingredient).delete(delete_ingredient),
        )
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(Ingredient::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<Ingredient>> {
    let ingredient = Ingredient::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    Ok(Json(ingredient))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    AppJson(mut payload): AppJson<NewIngredient>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    payload.normalize();
    payload
        .validate()
        .map_err(|details| AppError::invalid("Invalid ingredient data", details))?;

    let ingredient = Ingredient::create(&state.db, &payload, user_id).await?;
    info!(ingredient_id = ingredient.id, ?user_id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state, payload))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(mut payload): AppJson<IngredientPatch>,
) -> AppResult<Json<Ingredient>> {
    payload.normalize();
    payload
        .validate()
        .map_err(|details| AppError::invalid("Invalid ingredient data", details))?;

    let ingredient = Ingredient::update(&state.db, id, payload)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    info!(ingredient_id = id, "ingredient updated");
    Ok(Json(ingredient))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    if !Ingredient::delete(&state.db, id).await? {
        return Err(AppError::NotFound(NOT_FOUND));
    }
    info!(ingredient_id = id, "ingredient deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn export_ingredients(State(state): State<AppState>) -> AppResult<Response> {
    let ingredients = Ingredient::list(&state.db).await?;
    let bytes = export_xlsx(&ingredients)?;
    Ok(xlsx_download("ingredients.xlsx", bytes))
}

#[instrument(skip(state, mp))]
pub async fn import_ingredients(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    AppMultipart(mut mp): AppMultipart,
) -> AppResult<Response> {
    let upload = take_file(&mut mp, "file")
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let sheet = read_sheet(
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
        &upload.bytes,
    )?;

    let db = &state.db;
    let summary = import_rows(&sheet, |ingredient: NewIngredient| async move {
        Ingredient::create(db, &ingredient, user_id).await
    })
    .await;

    Ok(Json(summary.to_json("ingredients")?).into_response())
}
