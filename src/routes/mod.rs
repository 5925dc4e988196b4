// Route definitions

use axum::{routing::get, Router};

use crate::AppState;

mod api;
mod pages;

// Builds the router with state applied; static files and tracing are layered on in main.rs
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index_page))
        .route("/models", get(api::get_models))
        .route("/estimate", get(api::get_estimate))
        .with_state(app_state)
}
