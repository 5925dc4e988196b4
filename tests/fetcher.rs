//! Fetcher and reference loading against a mocked search site.

use std::{sync::Arc, time::Duration};

use autoprice_rust::{
    catalog::ReferenceLoader,
    config::DEFAULT_USER_AGENT,
    fetcher::{self, FetchError, FinnClient, ListingSource},
    models::Listing,
    query::SearchQuery,
};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, Request, ResponseTemplate,
};

const MARKUP_FIXTURE: &str = include_str!("fixtures/search_markup.html");
const EMBEDDED_FIXTURE: &str = include_str!("fixtures/search_embedded.html");

fn client(server: &MockServer, timeout: Duration) -> FinnClient {
    let http = fetcher::http_client(DEFAULT_USER_AGENT, timeout, None).unwrap();
    FinnClient::new(Arc::new(http), format!("{}/mobility/search/car", server.uri()))
}

fn query(pairs: &[(&str, &str)]) -> SearchQuery {
    let mut query = SearchQuery::default();
    for (k, v) in pairs {
        query.push(k, v);
    }
    query
}

#[tokio::test]
async fn sends_query_and_reads_markup_prices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mobility/search/car"))
        .and(query_param("make", "Bmw"))
        .and(query_param("model", "X5"))
        .and(query_param("year_from", "2017"))
        .and(|req: &Request| {
            req.headers.get("user-agent").and_then(|v| v.to_str().ok()) == Some(DEFAULT_USER_AGENT)
        })
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKUP_FIXTURE))
        .expect(1)
        .mount(&server)
        .await;

    let listings = client(&server, Duration::from_secs(5))
        .fetch(&query(&[("make", "Bmw"), ("model", "X5"), ("year_from", "2017")]))
        .await
        .unwrap();

    assert_eq!(
        listings,
        vec![
            Listing::new(349900, "BMW X5 xDrive40e M Sport"),
            Listing::new(289000, "BMW X5 xDrive30d"),
            Listing::new(412500, "BMW X5 xDrive45e M-Sport"),
        ]
    );
}

#[tokio::test]
async fn reads_embedded_data_prices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMBEDDED_FIXTURE))
        .mount(&server)
        .await;

    let listings = client(&server, Duration::from_secs(5))
        .fetch(&query(&[("make", "0.817")]))
        .await
        .unwrap();

    let prices: Vec<u32> = listings.iter().map(|l| l.price).collect();
    assert_eq!(prices, vec![310000, 229900, 199000]);
    assert_eq!(listings[2].heading, "Volkswagen Golf Variant");
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_secs(5)).fetch(&SearchQuery::default()).await;
    assert!(matches!(result, Err(FetchError::Status(status)) if status.as_u16() == 503));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MARKUP_FIXTURE)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_millis(200)).fetch(&SearchQuery::default()).await;
    assert!(matches!(result, Err(FetchError::Request(e)) if e.is_timeout()));
}

#[tokio::test]
async fn reference_data_comes_from_facets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mobility/search/car"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMBEDDED_FIXTURE))
        .expect(1)
        .mount(&server)
        .await;

    let catalogs = client(&server, Duration::from_secs(5)).load().await.unwrap();
    let (name, vw) = catalogs.brands.get("volkswagen").unwrap();
    assert_eq!(name, "Volkswagen");
    assert_eq!(vw.code.as_deref(), Some("0.817"));
    assert_eq!(vw.find_model("Passat").unwrap().value, "1.817.7532");
    assert_eq!(catalogs.regions.ordered_names(), vec!["Oslo", "Viken", "Abroad"]);
}

#[tokio::test]
async fn reference_data_needs_embedded_blob() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKUP_FIXTURE))
        .mount(&server)
        .await;

    assert!(client(&server, Duration::from_secs(5)).load().await.is_err());
}
