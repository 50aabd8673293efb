use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::MaybeAuthUser;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
