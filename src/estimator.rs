// Ties the pieces together: catalogs -> query -> cached fetch -> aggregate

use std::sync::Arc;

use crate::{
    aggregate::{self, Aggregate},
    cache::QueryCache,
    catalog::{Catalogs, ReferenceData},
    error::AppResult,
    fetcher::ListingSource,
    models::{ListingSet, QueryFilter},
    query::{self, MileageMode, SearchQuery},
};

// Outcome of one estimate request
#[derive(Debug, Clone)]
pub struct Estimate {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub aggregate: Aggregate,
    /// The model filter was dropped because the exact query found nothing.
    pub broadened: bool,
}

pub struct Estimator {
    reference: ReferenceData,
    cache: QueryCache,
    source: Arc<dyn ListingSource>,
    mileage_mode: MileageMode,
}

impl Estimator {
    pub fn new(reference: ReferenceData, source: Arc<dyn ListingSource>, mileage_mode: MileageMode) -> Self {
        Self { reference, cache: QueryCache::new(), source, mileage_mode }
    }

    pub async fn catalogs(&self) -> AppResult<Arc<Catalogs>> {
        Ok(self.reference.catalogs().await?)
    }

    /// Listings for a query, from the cache when possible.
    /// Upstream failures yield an empty set and are not cached.
    pub async fn listings(&self, query: &SearchQuery) -> Arc<ListingSet> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(count = hit.len(), "Cache hit");
            return hit;
        }

        match self.source.fetch(query).await {
            Ok(listings) => {
                tracing::info!(count = listings.len(), "Fetched listings");
                self.cache.put(key, listings)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Listing fetch failed; treating as no listings");
                Arc::new(Vec::new())
            }
        }
    }

    pub async fn estimate(&self, filter: &QueryFilter) -> AppResult<Estimate> {
        let catalogs = self.catalogs().await?;
        let resolved = query::build_query(filter, &catalogs, self.mileage_mode)?;

        let mut listings = self.listings(&resolved.query).await;
        let mut broadened = false;
        if listings.is_empty() {
            if let Some(broader) = resolved.query.without_model() {
                tracing::info!("No listings for the model; retrying with brand only");
                listings = self.listings(&broader).await;
                broadened = true;
            }
        }

        Ok(Estimate {
            brand: resolved.brand,
            model: resolved.model,
            aggregate: aggregate::aggregate(&listings, QueryFilter::value(&filter.trim)),
            broadened,
        })
    }
}
