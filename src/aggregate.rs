// Price statistics over a listing set, with optional trim narrowing.
// All divisions are integer floor divisions.

use serde::Serialize;

use crate::models::{Listing, PriceSummary};

/// What the trim keyword did to the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimStatus {
    NotRequested,
    Narrowed,
    /// No heading matched; every listing was used instead.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    NoResults,
    Summary { summary: PriceSummary, trim: TrimStatus },
}

/// Computes count/min/max/median/average. `None` for an empty list.
pub fn summarize(prices: &[u32]) -> Option<PriceSummary> {
    if prices.is_empty() {
        return None;
    }
    let mut sorted = prices.to_vec();
    sorted.sort_unstable();

    let count = sorted.len();
    let mid = count / 2;
    let median = if count % 2 == 1 {
        sorted[mid]
    } else {
        ((u64::from(sorted[mid - 1]) + u64::from(sorted[mid])) / 2) as u32
    };
    let sum: u64 = sorted.iter().map(|&p| u64::from(p)).sum();

    Some(PriceSummary {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        median,
        average: (sum / count as u64) as u32,
    })
}

/// Keeps listings whose heading contains the keyword, ignoring case.
/// Falls back to the full set when nothing matches.
pub fn narrow_by_trim<'a>(listings: &'a [Listing], trim: Option<&str>) -> (Vec<&'a Listing>, TrimStatus) {
    let keyword = match trim.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_lowercase(),
        None => return (listings.iter().collect(), TrimStatus::NotRequested),
    };

    let matching: Vec<&Listing> = listings
        .iter()
        .filter(|l| l.heading.to_lowercase().contains(&keyword))
        .collect();

    if matching.is_empty() {
        tracing::info!(trim = %keyword, total = listings.len(), "No listing matched the trim; using all listings.");
        (listings.iter().collect(), TrimStatus::Fallback)
    } else {
        (matching, TrimStatus::Narrowed)
    }
}

pub fn aggregate(listings: &[Listing], trim: Option<&str>) -> Aggregate {
    let (used, trim) = narrow_by_trim(listings, trim);
    let prices: Vec<u32> = used.iter().map(|l| l.price).collect();
    match summarize(&prices) {
        Some(summary) => Aggregate::Summary { summary, trim },
        None => Aggregate::NoResults,
    }
}
