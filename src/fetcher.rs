// Fetches search result pages from the classifieds site

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use crate::{
    catalog::{Catalogs, ReferenceLoader},
    extract,
    models::ListingSet,
    query::SearchQuery,
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Source of listings for a built query - enables mocking for tests.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> Result<ListingSet, FetchError>;
}

/// Builds the shared HTTP client used for every upstream request.
pub fn http_client(user_agent: &str, timeout: Duration, proxy_url: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(user_agent).timeout(timeout);
    if let Some(proxy_url) = proxy_url.filter(|p| !p.is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url).context("Invalid proxy URL")?);
        tracing::info!("Outbound requests go through the configured proxy.");
    }
    builder.build().context("Failed to build shared reqwest client")
}

// Client for the site's used-car search page
pub struct FinnClient {
    client: Arc<Client>,
    search_url: String,
}

impl FinnClient {
    pub fn new(client: Arc<Client>, search_url: impl Into<String>) -> Self {
        Self { client, search_url: search_url.into() }
    }

    async fn get_page(&self, params: &[(String, String)]) -> Result<String, FetchError> {
        tracing::debug!(url = %self.search_url, ?params, "Fetching search page");
        let response = self.client.get(&self.search_url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingSource for FinnClient {
    async fn fetch(&self, query: &SearchQuery) -> Result<ListingSet, FetchError> {
        let page = self.get_page(query.params()).await?;
        Ok(extract::extract_listings(&page))
    }
}

// Facets on the unfiltered search page double as the brand and region catalogs
#[async_trait]
impl ReferenceLoader for FinnClient {
    async fn load(&self) -> Result<Catalogs> {
        let page = self
            .get_page(&[])
            .await
            .context("Failed to fetch search page for reference data")?;
        let blob = extract::embedded_blob(&page).context("Search page has no embedded data")?;
        extract::reference_data_from_blob(&blob).context("Embedded data has no facets")
    }
}
