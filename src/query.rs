// Translates user filters into the search site's query parameters

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::Catalogs;
use crate::models::QueryFilter;

/// How the `km` filter maps onto the site's mileage range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MileageMode {
    /// `mileage_to = km`
    #[default]
    UpperBound,
    /// `mileage_from = 0.8 * km`, `mileage_to = 1.2 * km`
    Window,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown brand '{0}'")]
    UnknownBrand(String),
    #[error("Unknown model '{model}' for brand '{brand}'")]
    UnknownModel { brand: String, model: String },
}

/// Canonical form of a query: parameters sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<(String, String)>);

impl CacheKey {
    pub fn new(mut params: Vec<(String, String)>) -> Self {
        params.sort();
        Self(params)
    }
}

/// Ordered key/value parameters for the site's search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    params: Vec<(String, String)>,
}

impl SearchQuery {
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.params.push((key.to_string(), value.to_string()));
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.params.clone())
    }

    /// The same query with the model filter removed, or `None` if there was none.
    pub fn without_model(&self) -> Option<SearchQuery> {
        self.get("model")?;
        let params = self.params.iter().filter(|(k, _)| k != "model").cloned().collect();
        Some(SearchQuery { params })
    }
}

// A built query together with the canonical names it was resolved from
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub query: SearchQuery,
}

// Mileage is unsigned, so the low end is never below zero
fn mileage_window(km: u32) -> (u64, u64) {
    let km = u64::from(km);
    (km * 8 / 10, km * 12 / 10)
}

/// Builds the search parameters for a filter. Performs no I/O.
pub fn build_query(
    filter: &QueryFilter,
    catalogs: &Catalogs,
    mileage_mode: MileageMode,
) -> Result<ResolvedQuery, QueryError> {
    let mut query = SearchQuery::default();
    let mut brand_name = None;
    let mut model_name = None;

    let raw_model = QueryFilter::value(&filter.model);
    match QueryFilter::value(&filter.brand) {
        Some(raw_brand) => {
            let (key, entry) = catalogs
                .brands
                .get(raw_brand)
                .ok_or_else(|| QueryError::UnknownBrand(raw_brand.to_string()))?;
            query.push("make", entry.code.as_deref().unwrap_or(key));
            brand_name = Some(key.to_string());

            if let Some(raw_model) = raw_model {
                let model = entry.find_model(raw_model).ok_or_else(|| QueryError::UnknownModel {
                    brand: key.to_string(),
                    model: raw_model.to_string(),
                })?;
                query.push("model", &model.value);
                model_name = Some(model.name.clone());
            }
        }
        None => {
            if let Some(raw_model) = raw_model {
                query.push("model", raw_model);
                model_name = Some(raw_model.to_string());
            }
        }
    }

    if let Some(year) = QueryFilter::number::<i32>(&filter.year) {
        query.push("year_from", year);
        query.push("year_to", year);
    }

    if let Some(km) = QueryFilter::number::<u32>(&filter.km) {
        match mileage_mode {
            MileageMode::UpperBound => query.push("mileage_to", km),
            MileageMode::Window => {
                let (low, high) = mileage_window(km);
                query.push("mileage_from", low);
                query.push("mileage_to", high);
            }
        }
    }

    if let Some(fuel) = QueryFilter::number::<i64>(&filter.fuel) {
        query.push("fuel", fuel);
    }
    if let Some(gearbox) = QueryFilter::number::<i64>(&filter.gearbox) {
        query.push("transmission", gearbox);
    }

    if let Some(region) = QueryFilter::value(&filter.region) {
        match catalogs.regions.resolve(region) {
            Some(location) => query.push("location", location),
            None => tracing::debug!(region, "Region not sent to the site"),
        }
    }

    Ok(ResolvedQuery { brand: brand_name, model: model_name, query })
}
