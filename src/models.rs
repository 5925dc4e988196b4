// Data structures shared across the query, fetch, and aggregation layers

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Filters received from the form or the /estimate query string.
// Every field arrives as a raw string; numeric ones are parsed on use.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct QueryFilter {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub km: Option<String>, // Kilometres driven
    pub fuel: Option<String>, // Site fuel code
    pub gearbox: Option<String>, // Site transmission code
    pub trim: Option<String>,
    #[serde(rename = "location")] // Form and site both call it location
    pub region: Option<String>,
}

impl QueryFilter {
    /// Returns the trimmed value of a field, treating blank input as absent.
    pub fn value(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Parses a numeric field, dropping it when the input is not a number.
    pub fn number<T: FromStr>(field: &Option<String>) -> Option<T> {
        Self::value(field).and_then(|v| v.parse().ok())
    }

    /// Names of the fields /estimate requires that are missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("brand", &self.brand),
            ("model", &self.model),
            ("year", &self.year),
            ("km", &self.km),
            ("fuel", &self.fuel),
            ("gearbox", &self.gearbox),
        ]
        .into_iter()
        .filter(|(_, field)| Self::value(field).is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

// A single ad from a results page: its asking price and heading text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub price: u32,
    pub heading: String,
}

impl Listing {
    pub fn new(price: u32, heading: impl Into<String>) -> Self {
        Self { price, heading: heading.into() }
    }
}

// Listings from one fetch, in the order the site returned them
pub type ListingSet = Vec<Listing>;

// A model as presented to the form: display name plus the value the site expects
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    pub value: String,
}

impl ModelEntry {
    /// Model whose site value is its display name (bundled catalog).
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { value: name.clone(), name }
    }
}

// Summary statistics over the prices actually used for an estimate
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PriceSummary {
    pub count: usize,
    pub min: u32,
    pub max: u32,
    pub median: u32,
    pub average: u32,
}
