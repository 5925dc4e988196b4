// Reference data: which brands, models and regions the search site knows about

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::RwLock;

use crate::models::ModelEntry;

/// Region that is always listed last.
pub const ABROAD: &str = "Abroad";
/// Region choice meaning "anywhere"; never sent to the site.
pub const ANY_REGION: &str = "Alle";

/// Canonical catalog key for a brand: first character upper-cased, the rest lower-cased.
pub fn normalize_brand(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandEntry {
    pub code: Option<String>, // Site make code, when the catalog came from the site
    pub models: Vec<ModelEntry>,
}

impl BrandEntry {
    /// Finds a model by display name or site value, ignoring case.
    pub fn find_model(&self, model: &str) -> Option<&ModelEntry> {
        let wanted = model.trim().to_lowercase();
        self.models
            .iter()
            .find(|m| m.name.to_lowercase() == wanted || m.value.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrandCatalog {
    brands: BTreeMap<String, BrandEntry>,
}

impl BrandCatalog {
    pub fn new(brands: impl IntoIterator<Item = (String, BrandEntry)>) -> Self {
        Self {
            brands: brands
                .into_iter()
                .map(|(name, entry)| (normalize_brand(&name), entry))
                .collect(),
        }
    }

    /// Builds a catalog from the bundled `brand -> [model names]` layout.
    pub fn from_model_lists(lists: HashMap<String, Vec<String>>) -> Self {
        Self::new(lists.into_iter().map(|(brand, models)| {
            let entry = BrandEntry {
                code: None,
                models: models.into_iter().map(ModelEntry::named).collect(),
            };
            (brand, entry)
        }))
    }

    /// Looks a brand up after normalizing it. Returns the canonical key with the entry.
    pub fn get(&self, brand: &str) -> Option<(&str, &BrandEntry)> {
        self.brands
            .get_key_value(&normalize_brand(brand))
            .map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn brand_names(&self) -> impl Iterator<Item = &str> {
        self.brands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: HashMap<String, String>,
}

impl RegionCatalog {
    pub fn new(regions: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { regions: regions.into_iter().collect() }
    }

    /// Site location value for a region. `None` for "Alle", blanks and unknown names.
    pub fn resolve(&self, region: &str) -> Option<&str> {
        let region = region.trim();
        if region.is_empty() || region.eq_ignore_ascii_case(ANY_REGION) {
            return None;
        }
        self.regions.get(region).map(String::as_str)
    }

    /// Region names sorted alphabetically, with "Abroad" moved to the end.
    pub fn ordered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.keys().map(String::as_str).collect();
        names.sort_by(|a, b| (*a == ABROAD).cmp(&(*b == ABROAD)).then_with(|| a.cmp(b)));
        names
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

// Brands and regions loaded together from one source
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub brands: BrandCatalog,
    pub regions: RegionCatalog,
}

/// Somewhere reference data can be loaded from.
#[async_trait]
pub trait ReferenceLoader: Send + Sync {
    async fn load(&self) -> Result<Catalogs>;
}

// Bundled JSON files: `{"Bmw": ["3-serie", ...]}` and `{"Oslo": "0.20061", ...}`
pub struct FileLoader {
    catalog_path: PathBuf,
    regions_path: Option<PathBuf>,
}

impl FileLoader {
    pub fn new(catalog_path: impl Into<PathBuf>, regions_path: Option<PathBuf>) -> Self {
        Self { catalog_path: catalog_path.into(), regions_path }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[async_trait]
impl ReferenceLoader for FileLoader {
    async fn load(&self) -> Result<Catalogs> {
        let lists: HashMap<String, Vec<String>> = read_json(&self.catalog_path).await?;
        let regions = match &self.regions_path {
            Some(path) => RegionCatalog::new(read_json::<HashMap<String, String>>(path).await?),
            None => RegionCatalog::default(),
        };
        Ok(Catalogs { brands: BrandCatalog::from_model_lists(lists), regions })
    }
}

/// Process-wide reference data, loaded on first use and kept for the process lifetime.
///
/// An empty brand catalog is handed out but not kept, so the next access loads again.
/// Concurrent first requests may both load; the last write wins with equivalent data.
pub struct ReferenceData {
    loader: Arc<dyn ReferenceLoader>,
    loaded: RwLock<Option<Arc<Catalogs>>>,
}

impl ReferenceData {
    pub fn new(loader: Arc<dyn ReferenceLoader>) -> Self {
        Self { loader, loaded: RwLock::new(None) }
    }

    pub async fn catalogs(&self) -> Result<Arc<Catalogs>> {
        if let Some(catalogs) = &*self.loaded.read().await {
            return Ok(Arc::clone(catalogs));
        }

        let catalogs = Arc::new(self.loader.load().await.context("Failed to load reference data")?);
        if catalogs.brands.is_empty() {
            tracing::warn!("Reference data loaded with no brands; will retry on next access.");
            return Ok(catalogs);
        }

        tracing::info!(
            brands = catalogs.brands.len(),
            regions = catalogs.regions.len(),
            "Reference data loaded."
        );
        *self.loaded.write().await = Some(Arc::clone(&catalogs));
        Ok(catalogs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn normalization_is_case_insensitive_and_idempotent() {
        for raw in ["bmw", "BMW", "Bmw", "bMW", " bmw "] {
            assert_eq!(normalize_brand(raw), "Bmw");
            assert_eq!(normalize_brand(&normalize_brand(raw)), normalize_brand(raw));
        }
        assert_eq!(normalize_brand("VOLKSWAGEN"), "Volkswagen");
        assert_eq!(normalize_brand(""), "");
    }

    #[test]
    fn brand_lookup_normalizes_input() {
        let catalog = BrandCatalog::from_model_lists(HashMap::from([(
            "Audi".to_string(),
            vec!["A4".to_string(), "Q5".to_string()],
        )]));
        let (key, entry) = catalog.get("AUDI").unwrap();
        assert_eq!(key, "Audi");
        assert_eq!(entry.find_model("q5").unwrap().value, "Q5");
        assert!(entry.find_model("A6").is_none());
        assert!(catalog.get("Saab").is_none());
    }

    #[test]
    fn abroad_is_always_last() {
        let regions = RegionCatalog::new([
            ("Abroad".to_string(), "22045".to_string()),
            ("Viken".to_string(), "0.22030".to_string()),
            ("Agder".to_string(), "0.22042".to_string()),
            ("Oslo".to_string(), "0.20061".to_string()),
        ]);
        assert_eq!(regions.ordered_names(), vec!["Agder", "Oslo", "Viken", "Abroad"]);
    }

    #[test]
    fn any_region_resolves_to_nothing() {
        let regions = RegionCatalog::new([("Oslo".to_string(), "0.20061".to_string())]);
        assert_eq!(regions.resolve("Oslo"), Some("0.20061"));
        assert_eq!(regions.resolve("Alle"), None);
        assert_eq!(regions.resolve(""), None);
        assert_eq!(regions.resolve("Atlantis"), None);
    }

    struct CountingLoader {
        calls: AtomicUsize,
        brands: Vec<&'static str>,
    }

    #[async_trait]
    impl ReferenceLoader for CountingLoader {
        async fn load(&self) -> Result<Catalogs> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lists = self.brands.iter().map(|b| (b.to_string(), vec!["X".to_string()])).collect();
            Ok(Catalogs { brands: BrandCatalog::from_model_lists(lists), ..Default::default() })
        }
    }

    #[tokio::test]
    async fn populated_catalog_is_loaded_once() {
        let loader = Arc::new(CountingLoader { calls: AtomicUsize::new(0), brands: vec!["Volvo"] });
        let data = ReferenceData::new(loader.clone());
        data.catalogs().await.unwrap();
        data.catalogs().await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_catalog_is_reloaded() {
        let loader = Arc::new(CountingLoader { calls: AtomicUsize::new(0), brands: vec![] });
        let data = ReferenceData::new(loader.clone());
        data.catalogs().await.unwrap();
        data.catalogs().await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn file_loader_reads_bundled_layout() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("bilmerker.json");
        let regions_path = dir.path().join("regions.json");
        std::fs::write(&catalog_path, r#"{"Tesla": ["Model 3", "Model Y"]}"#).unwrap();
        std::fs::write(&regions_path, r#"{"Oslo": "0.20061"}"#).unwrap();

        let catalogs = FileLoader::new(&catalog_path, Some(regions_path)).load().await.unwrap();
        let (_, tesla) = catalogs.brands.get("tesla").unwrap();
        assert_eq!(tesla.models.len(), 2);
        assert_eq!(catalogs.regions.resolve("Oslo"), Some("0.20061"));
    }

    #[tokio::test]
    async fn file_loader_reports_missing_file() {
        let result = FileLoader::new("/nonexistent/bilmerker.json", None).load().await;
        assert!(result.is_err());
    }
}
