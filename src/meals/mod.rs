pub mod aggregate;
mod dto;
pub mod handlers;
mod keys;
pub mod model;
pub mod sanitize;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
