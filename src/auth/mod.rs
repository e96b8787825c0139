use crate::state::AppState;
use axum::Router;

pub mod directory;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod redirect;
pub mod services;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
