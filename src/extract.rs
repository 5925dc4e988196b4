// Price extraction from a search results page.
//
// Two page layouts are handled: pages that embed their search state as a JSON blob,
// and plain markup where prices sit on lines like `Pris <strong>123 456</strong>`.
// Both are best-effort: records that cannot be read are skipped, never fatal.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::catalog::{BrandCatalog, BrandEntry, Catalogs, RegionCatalog};
use crate::models::{Listing, ListingSet, ModelEntry};

/// Element id of the embedded search state.
pub const EMBEDDED_DATA_ID: &str = "__NEXT_DATA__";

const CURRENCY_MARKER: &str = "Pris";
const EMPHASIS_MARKER: &str = "strong";
const EMPHASIS_OPEN: &str = "<strong>";
const EMPHASIS_CLOSE: &str = "</strong>";

const DOCS_POINTER: &str = "/props/pageProps/search/docs";
const FILTERS_POINTER: &str = "/props/pageProps/search/filters";
const PRICE_FIELDS: [&str; 3] = ["price", "price_amount", "total_price"];
const NESTED_PRICE_FIELDS: [&str; 3] = ["amount", "value", "total"];
const HEADING_FIELDS: [&str; 2] = ["heading", "title"];

static EMBEDDED_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(&format!("script#{EMBEDDED_DATA_ID}")).unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3").unwrap());

/// Extracts listings using whichever strategy matches the page.
pub fn extract_listings(page: &str) -> ListingSet {
    match embedded_blob(page) {
        Some(blob) => {
            let listings = listings_from_blob(&blob);
            tracing::debug!(count = listings.len(), "Extracted listings from embedded data");
            listings
        }
        None => {
            let listings = listings_from_lines(page);
            tracing::debug!(count = listings.len(), "Extracted listings from page markup");
            listings
        }
    }
}

/// Parses the embedded data element, if the page has one with valid JSON.
pub fn embedded_blob(page: &str) -> Option<Value> {
    let document = Html::parse_document(page);
    let element = document.select(&EMBEDDED_SELECTOR).next()?;
    let text: String = element.text().collect();
    match serde_json::from_str(&text) {
        Ok(blob) => Some(blob),
        Err(e) => {
            tracing::debug!(error = %e, "Embedded data element is not valid JSON");
            None
        }
    }
}

// Strips `&nbsp;` and whitespace (including NBSP), drops a trailing decimal part,
// then removes `.`/`,` thousands separators. Accepts the rest only if it is all digits.
fn clean_digits(raw: &str) -> Option<u32> {
    let compact: String = raw.replace("&nbsp;", "").chars().filter(|c| !c.is_whitespace()).collect();
    // A last separator followed by one or two digits starts the øre part
    let whole = match compact.rfind(['.', ',']) {
        Some(pos) => {
            let tail = &compact[pos + 1..];
            if (1..=2).contains(&tail.len()) && tail.bytes().all(|b| b.is_ascii_digit()) {
                &compact[..pos]
            } else {
                compact.as_str()
            }
        }
        None => compact.as_str(),
    };
    let digits: String = whole.chars().filter(|c| *c != '.' && *c != ',').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Coerces a price string such as `"249 900 kr"` or `"249.900,-"` to an integer.
pub fn parse_price_text(raw: &str) -> Option<u32> {
    let compact: String = raw
        .replace("&nbsp;", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let mut rest = compact.as_str();
    rest = rest.strip_prefix("kr").unwrap_or(rest);
    for suffix in ["nok", "kr", ",-", "-"] {
        rest = rest.strip_suffix(suffix).unwrap_or(rest);
    }
    clean_digits(rest)
}

fn heading_on_line(line: &str) -> Option<String> {
    if !(line.contains("<h2") || line.contains("<h3")) {
        return None;
    }
    let fragment = Html::parse_fragment(line);
    let heading = fragment.select(&HEADING_SELECTOR).next()?;
    let text = heading.text().collect::<String>();
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Line-scanning strategy. Each price is paired with the last heading seen above it.
pub fn listings_from_lines(page: &str) -> ListingSet {
    let mut heading = String::new();
    let mut listings = Vec::new();

    for line in page.lines() {
        if let Some(h) = heading_on_line(line) {
            heading = h;
        }
        if !(line.contains(CURRENCY_MARKER) && line.contains(EMPHASIS_MARKER)) {
            continue;
        }
        let Some(start) = line.find(EMPHASIS_OPEN).map(|i| i + EMPHASIS_OPEN.len()) else {
            continue;
        };
        let Some(len) = line[start..].find(EMPHASIS_CLOSE) else {
            continue;
        };
        if let Some(price) = clean_digits(&line[start..start + len]) {
            listings.push(Listing::new(price, std::mem::take(&mut heading)));
        }
    }
    listings
}

fn coerce_price(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => parse_price_text(s),
        Value::Object(map) => NESTED_PRICE_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .find_map(coerce_price),
        _ => None,
    }
}

fn listing_from_record(record: &Value) -> Option<Listing> {
    let price = PRICE_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(coerce_price)?;
    let heading = HEADING_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .next()
        .unwrap_or_default();
    Some(Listing::new(price, heading.trim()))
}

/// Embedded-data strategy: reads the listing records under the search state.
pub fn listings_from_blob(blob: &Value) -> ListingSet {
    let Some(records) = blob.pointer(DOCS_POINTER).and_then(Value::as_array) else {
        tracing::debug!("Embedded data has no listing records");
        return Vec::new();
    };
    records.iter().filter_map(listing_from_record).collect()
}

// Facet filter items: `{display_name, value, filter_items: [...]}`
fn facet_items<'a>(facet: &'a Value) -> impl Iterator<Item = (&'a str, &'a str, &'a Value)> {
    facet
        .get("filter_items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let name = item.get("display_name").and_then(Value::as_str)?;
            let value = item.get("value").and_then(Value::as_str)?;
            Some((name, value, item))
        })
}

fn facet<'a>(filters: &'a [Value], name: &str) -> Option<&'a Value> {
    filters
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
}

/// Reads brand and region facets from the embedded search state.
pub fn reference_data_from_blob(blob: &Value) -> Option<Catalogs> {
    let filters = blob.pointer(FILTERS_POINTER)?.as_array()?;

    let brands = facet(filters, "make")
        .map(|make| {
            BrandCatalog::new(facet_items(make).map(|(name, code, item)| {
                let models = facet_items(item)
                    .map(|(model, value, _)| ModelEntry { name: model.to_string(), value: value.to_string() })
                    .collect();
                (name.to_string(), BrandEntry { code: Some(code.to_string()), models })
            }))
        })
        .unwrap_or_default();

    let regions = facet(filters, "location")
        .map(|location| {
            RegionCatalog::new(
                facet_items(location).map(|(name, value, _)| (name.to_string(), value.to_string())),
            )
        })
        .unwrap_or_default();

    Some(Catalogs { brands, regions })
}
