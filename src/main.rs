use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autoprice_rust::{
    catalog::{FileLoader, ReferenceData, ReferenceLoader},
    config::{CatalogSource, Settings},
    estimator::Estimator,
    fetcher::{self, FinnClient},
    routes, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "autoprice_rust=info,tower_http=info".into())) // Default to info if RUST_LOG not set
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing price estimator server...");

    // Load configuration
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    // One client for every upstream request, with the identifying user agent and timeout
    let http_client = Arc::new(fetcher::http_client(
        &shared_settings.user_agent,
        shared_settings.request_timeout(),
        shared_settings.proxy_url.as_deref(),
    )?);
    tracing::info!("Shared HTTP client created.");

    let finn = Arc::new(FinnClient::new(http_client, shared_settings.search_url.clone()));
    let loader: Arc<dyn ReferenceLoader> = match shared_settings.catalog_source {
        CatalogSource::File => Arc::new(FileLoader::new(
            &shared_settings.catalog_path,
            shared_settings.regions_path.as_ref().map(Into::into),
        )),
        CatalogSource::Remote => finn.clone(),
    };
    let estimator = Arc::new(Estimator::new(
        ReferenceData::new(loader),
        finn,
        shared_settings.mileage_mode,
    ));

    // Populate the catalogs up front; a failure here is retried on first request
    if let Err(e) = estimator.catalogs().await {
        tracing::warn!("Reference data not available at startup: {}", e);
    }

    let app_state = AppState { estimator };

    let app = routes::create_router(app_state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    let addr = shared_settings.server_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    // Run the server
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
