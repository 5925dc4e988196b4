//! Used-car price estimates from classifieds search results.

use axum::extract::FromRef;
use std::sync::Arc;

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod estimator;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod query;
pub mod routes;

use crate::estimator::Estimator;

// Shared application state handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub estimator: Arc<Estimator>,
}
