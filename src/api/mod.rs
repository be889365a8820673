// src/api/mod.rs
//
// Thin client for the ProPublica Nonprofits v2 API. Two endpoints matter:
// per-organization filings by EIN, and free-text organization search.

pub mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client, StatusCode,
};
use tracing::debug;

use types::{OrgResponse, SearchResponse};

pub const API_BASE_URL: &str = "https://projects.propublica.org/nonprofits/api/v2/organizations";
pub const SEARCH_API_URL: &str = "https://projects.propublica.org/nonprofits/api/v2/search.json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a fetch did not produce a payload. Callers skip the item and move on;
/// nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Connection, DNS, or timeout trouble before a status arrived.
    Transport(String),
    /// Non-success HTTP status other than 404.
    Status(u16),
    /// Body arrived but did not decode as the expected JSON shape.
    Decode(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Transport(e) => write!(f, "transport error: {}", e),
            FetchFailure::Status(code) => write!(f, "HTTP status {}", code),
            FetchFailure::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

/// Outcome of one API call. `NotFound` covers HTTP 404, which for this API
/// just means "no data for that EIN" and is not an error condition.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Found(T),
    NotFound,
    Failed(FetchFailure),
}

impl<T> FetchOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Build the shared HTTP client with the fixed request headers and timeout
/// used for every call, API and PDF downloads alike.
pub fn build_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("building HTTP client")
}

/// Strip dashes and surrounding whitespace so the EIN is usable in a URL path.
pub fn clean_ein(raw: &str) -> String {
    raw.trim().replace('-', "")
}

/// Fetch all filings for one organization: GET `/organizations/{ein}.json`.
pub async fn get_filings(client: &Client, ein: &str) -> FetchOutcome<OrgResponse> {
    if ein.is_empty() {
        return FetchOutcome::NotFound;
    }
    let url = format!("{}/{}.json", API_BASE_URL, ein);
    debug!(%url, "fetching filings");
    get_json(client, &url, &[]).await
}

/// Search organizations by free-text name: GET `/search.json?q=...`.
pub async fn search_organizations(client: &Client, query: &str) -> FetchOutcome<SearchResponse> {
    if query.is_empty() {
        return FetchOutcome::NotFound;
    }
    debug!(%query, "searching organizations");
    get_json(client, SEARCH_API_URL, &[("q", query)]).await
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> FetchOutcome<T> {
    let mut req = client.get(url);
    if !query.is_empty() {
        req = req.query(query);
    }
    let resp = match req.send().await {
        Ok(resp) => resp,
        Err(e) => return FetchOutcome::Failed(FetchFailure::Transport(e.to_string())),
    };
    match resp.status() {
        StatusCode::NOT_FOUND => return FetchOutcome::NotFound,
        status if !status.is_success() => {
            return FetchOutcome::Failed(FetchFailure::Status(status.as_u16()))
        }
        _ => {}
    }
    match resp.json::<T>().await {
        Ok(payload) => FetchOutcome::Found(payload),
        Err(e) => FetchOutcome::Failed(FetchFailure::Decode(e.to_string())),
    }
}
