// HTML front page: the filter form plus the estimate for the submitted filters

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
};

use crate::{
    aggregate::{Aggregate, TrimStatus},
    catalog::{normalize_brand, Catalogs, ANY_REGION},
    error::{AppError, AppResult},
    models::{PriceSummary, QueryFilter},
    AppState,
};

use super::api::NO_PRICES_MESSAGE;

pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    brands: Vec<SelectOption>,
    models: Vec<SelectOption>,
    regions: Vec<SelectOption>,
    brand_chosen: bool,
    model_chosen: bool,
    year: String,
    km: String,
    fuel: String,
    gearbox: String,
    trim: String,
    summary: Option<PriceSummary>,
    notices: Vec<String>,
    error: Option<String>,
}

impl IndexTemplate {
    fn new(filter: &QueryFilter, catalogs: &Catalogs) -> Self {
        let text = |field: &Option<String>| QueryFilter::value(field).unwrap_or_default().to_string();
        let chosen_brand = QueryFilter::value(&filter.brand).map(normalize_brand);
        let chosen_model = QueryFilter::value(&filter.model).map(str::to_lowercase);
        let chosen_region = QueryFilter::value(&filter.region).unwrap_or(ANY_REGION);

        let brands: Vec<SelectOption> = catalogs
            .brands
            .brand_names()
            .map(|name| SelectOption {
                label: name.to_string(),
                value: name.to_string(),
                selected: chosen_brand.as_deref() == Some(name),
            })
            .collect();

        let models: Vec<SelectOption> = chosen_brand
            .as_deref()
            .and_then(|brand| catalogs.brands.get(brand))
            .map(|(_, entry)| {
                entry
                    .models
                    .iter()
                    .map(|m| SelectOption {
                        label: m.name.clone(),
                        value: m.value.clone(),
                        selected: chosen_model.as_deref().is_some_and(|c| {
                            c == m.name.to_lowercase() || c == m.value.to_lowercase()
                        }),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let regions = std::iter::once(ANY_REGION)
            .chain(catalogs.regions.ordered_names())
            .map(|name| SelectOption {
                label: name.to_string(),
                value: name.to_string(),
                selected: name == chosen_region,
            })
            .collect();

        Self {
            brand_chosen: brands.iter().any(|o| o.selected),
            model_chosen: models.iter().any(|o| o.selected),
            brands,
            models,
            regions,
            year: text(&filter.year),
            km: text(&filter.km),
            fuel: text(&filter.fuel),
            gearbox: text(&filter.gearbox),
            trim: text(&filter.trim),
            summary: None,
            notices: Vec::new(),
            error: None,
        }
    }
}

pub async fn index_page(
    State(app_state): State<AppState>,
    Query(filter): Query<QueryFilter>,
) -> AppResult<impl IntoResponse> {
    let catalogs = app_state.estimator.catalogs().await?;
    let mut template = IndexTemplate::new(&filter, &catalogs);

    // Only estimate once a brand has been submitted
    if QueryFilter::value(&filter.brand).is_some() {
        tracing::info!("[HANDLER] / - Estimate requested: {:?}", filter);
        match app_state.estimator.estimate(&filter).await {
            Ok(estimate) => {
                if estimate.broadened {
                    template.notices.push("No ads for that model; showing prices for the whole brand.".to_string());
                }
                match estimate.aggregate {
                    Aggregate::NoResults => template.notices.push(NO_PRICES_MESSAGE.to_string()),
                    Aggregate::Summary { summary, trim } => {
                        if trim == TrimStatus::Fallback {
                            template.notices.push(format!(
                                "No ads matched trim '{}'; showing every matching ad.",
                                template.trim
                            ));
                        }
                        template.summary = Some(summary);
                    }
                }
            }
            Err(AppError::Internal(e)) => return Err(AppError::Internal(e)),
            Err(e) => template.error = Some(e.to_string()),
        }
    }

    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render index template: {}", e);
            Err(AppError::Internal(anyhow::Error::new(e)))
        }
    }
}
