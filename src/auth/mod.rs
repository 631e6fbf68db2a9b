use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod cookies;
pub mod dto;
pub mod guards;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_memory;
pub mod repo_pg;
pub mod repo_types;
pub mod session;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().merge(handlers::auth_routes(state))
}
