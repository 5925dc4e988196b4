// JSON endpoints: /models and /estimate

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{Aggregate, TrimStatus},
    error::{AppError, AppResult},
    models::{ModelEntry, QueryFilter},
    AppState,
};

// --- Response Wrappers ---

#[derive(Serialize)]
struct ModelsResponse {
    brand: String,
    models: Vec<ModelEntry>,
}

#[derive(Serialize)]
struct PriceEstimate {
    min: u32,
    max: u32,
    median: u32,
    average: u32,
}

#[derive(Serialize)]
struct EstimateResponse {
    brand: String,
    model: String,
    year: String,
    km: String,
    fuel: String,
    gearbox: String,
    count: usize,
    trim_status: TrimStatus,
    broadened_to_brand: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    price_estimate: PriceEstimate,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

pub const NO_PRICES_MESSAGE: &str = "No prices found for the given criteria";

// --- Request Structs ---

#[derive(Deserialize)]
pub struct ModelsQuery {
    brand: Option<String>,
}

// --- API Handlers ---

pub async fn get_models(
    State(app_state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> AppResult<Json<impl Serialize>> {
    let brand = QueryFilter::value(&query.brand)
        .ok_or_else(|| AppError::BadRequest("Specify a brand with ?brand=".to_string()))?;
    tracing::info!("[HANDLER] /models - Request received for brand: {}", brand);

    let catalogs = app_state.estimator.catalogs().await?;
    let (key, entry) = catalogs
        .brands
        .get(brand)
        .ok_or_else(|| AppError::NotFound(format!("Brand '{}' does not exist", brand)))?;

    tracing::debug!("[HANDLER] /models - {} models for '{}'", entry.models.len(), key);
    Ok(Json(ModelsResponse { brand: key.to_string(), models: entry.models.clone() }))
}

pub async fn get_estimate(
    State(app_state): State<AppState>,
    Query(filter): Query<QueryFilter>,
) -> AppResult<Response> {
    tracing::info!("[HANDLER] /estimate - Request received: {:?}", filter);

    let missing = filter.missing_required();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing one or more parameters: {}",
            missing.join(", ")
        )));
    }

    let estimate = app_state.estimator.estimate(&filter).await?;
    let (summary, trim_status) = match estimate.aggregate {
        Aggregate::NoResults => {
            tracing::info!("[HANDLER] /estimate - No prices found.");
            return Ok(Json(MessageResponse { message: NO_PRICES_MESSAGE.to_string() }).into_response());
        }
        Aggregate::Summary { summary, trim } => (summary, trim),
    };

    let message = (trim_status == TrimStatus::Fallback).then(|| {
        format!(
            "No listings matched trim '{}'; the estimate uses all matching ads.",
            QueryFilter::value(&filter.trim).unwrap_or_default()
        )
    });

    let given = |field: &Option<String>| QueryFilter::value(field).unwrap_or_default().to_string();
    Ok(Json(EstimateResponse {
        brand: estimate.brand.unwrap_or_else(|| given(&filter.brand)),
        model: estimate.model.unwrap_or_else(|| given(&filter.model)),
        year: given(&filter.year),
        km: given(&filter.km),
        fuel: given(&filter.fuel),
        gearbox: given(&filter.gearbox),
        count: summary.count,
        trim_status,
        broadened_to_brand: estimate.broadened,
        message,
        price_estimate: PriceEstimate {
            min: summary.min,
            max: summary.max,
            median: summary.median,
            average: summary.average,
        },
    })
    .into_response())
}
