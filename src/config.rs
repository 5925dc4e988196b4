// Settings layered from defaults, an optional config.toml, and APP_* environment variables.
// PORT always wins for the listen port.

use anyhow::Result;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::{net::SocketAddr, time::Duration};

use crate::query::MileageMode;

pub const DEFAULT_SEARCH_URL: &str = "https://www.finn.no/mobility/search/car";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

/// Where brand and region catalogs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    File,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub search_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub mileage_mode: MileageMode,
    pub catalog_source: CatalogSource,
    pub catalog_path: String,
    pub regions_path: Option<String>,
    pub proxy_url: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Self::defaults()?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_SEARCH_URL)
            .add_source(Environment::with_prefix("APP"))
            .set_override_option("port", std::env::var("PORT").ok())?;

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("port", 5000)?
            .set_default("search_url", DEFAULT_SEARCH_URL)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("request_timeout_secs", 5)?
            .set_default("mileage_mode", "upper_bound")?
            .set_default("catalog_source", "file")?
            .set_default("catalog_path", "bilmerker.json")?
            .set_default("regions_path", "regions.json")?)
    }

    /// Always the wildcard address.
    pub fn server_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize() {
        let settings: Settings = Settings::defaults().unwrap().build().unwrap().try_deserialize().unwrap();
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.server_address().to_string(), "0.0.0.0:5000");
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.mileage_mode, MileageMode::UpperBound);
        assert_eq!(settings.catalog_source, CatalogSource::File);
        assert!(settings.proxy_url.is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let settings: Settings = Settings::defaults()
            .unwrap()
            .set_override("port", "8080")
            .unwrap()
            .set_override("mileage_mode", "window")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.mileage_mode, MileageMode::Window);
    }
}
