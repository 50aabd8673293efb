pub mod handlers;
pub mod repo;
pub mod repo_types;
mod sheet;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::ingredient_routes()
}
