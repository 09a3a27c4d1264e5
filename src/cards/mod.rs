use crate::state::AppState;
use axum::Router;

pub mod domain;
mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::card_routes()
}
