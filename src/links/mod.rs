// src/links/mod.rs
//
// Builds the per-run filing cache (EIN -> tax year -> PDF URL) and joins it
// against a dataset to fill the 990_PDF_URL column.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::api::{self, types::Filing, FetchOutcome};
use crate::dataset::Dataset;

pub const PDF_URL_COLUMN: &str = "990_PDF_URL";
pub const CORRECTED_EIN_COLUMN: &str = "Corrected_EIN";
pub const EIN_COLUMN: &str = "EIN";
pub const YEAR_COLUMN: &str = "Year";

/// EIN -> tax year -> PDF URL, built once per run and discarded after the
/// join. Write policy is first-seen-wins: since with-data filings are
/// inserted before without-data ones, processed returns beat raw scans.
#[derive(Debug, Default)]
pub struct FilingCache {
    entries: HashMap<String, HashMap<i32, String>>,
}

impl FilingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record filings under `ein` exactly as keyed in the dataset (dashes
    /// and all), so later lookups by cell value hit.
    pub fn insert_filings<'a>(
        &mut self,
        ein: &str,
        filings: impl IntoIterator<Item = &'a Filing>,
    ) {
        let by_year = self.entries.entry(ein.to_string()).or_default();
        for filing in filings {
            let (Some(year), Some(url)) = (filing.tax_year(), filing.pdf_link()) else {
                continue;
            };
            by_year.entry(year).or_insert_with(|| url.to_string());
        }
    }

    /// Mark an EIN as fetched even when nothing usable came back, so lookups
    /// distinguish "no filings" from "never asked".
    pub fn mark_fetched(&mut self, ein: &str) {
        self.entries.entry(ein.to_string()).or_default();
    }

    pub fn lookup(&self, ein: &str, year: i32) -> Option<&str> {
        self.entries.get(ein)?.get(&year).map(String::as_str)
    }

    pub fn org_count(&self) -> usize {
        self.entries.len()
    }

    pub fn link_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Fetch filings for every EIN in `eins` (sorted for a deterministic
    /// progress order) with a fixed delay between requests. Failures are
    /// logged and skipped; the batch always runs to completion.
    pub async fn build(client: &Client, eins: &[String], request_delay: Duration) -> Self {
        let mut sorted: Vec<&String> = eins.iter().collect();
        sorted.sort();
        sorted.dedup();
        let total = sorted.len();

        let mut cache = Self::new();
        for (i, ein) in sorted.into_iter().enumerate() {
            info!("fetching EIN [{}/{}]: {}", i + 1, total, ein);
            cache.mark_fetched(ein);

            match api::get_filings(client, &api::clean_ein(ein)).await {
                FetchOutcome::Found(resp) => {
                    cache.insert_filings(ein, resp.all_filings());
                }
                FetchOutcome::NotFound => {
                    info!(%ein, "no data for EIN");
                }
                FetchOutcome::Failed(failure) => {
                    warn!(%ein, %failure, "fetch failed, skipping");
                }
            }
            sleep(request_delay).await;
        }

        info!(
            orgs = cache.org_count(),
            links = cache.link_count(),
            "filing cache built"
        );
        cache
    }
}

/// Match/coverage tally for one join pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchReport {
    pub matched: usize,
    pub total: usize,
}

impl MatchReport {
    pub fn coverage_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }
}

/// The EIN column the join and downloads key on: the corrected one when the
/// correction step has run, else the original.
pub fn ein_column(dataset: &Dataset) -> &'static str {
    if dataset.has_column(CORRECTED_EIN_COLUMN) {
        CORRECTED_EIN_COLUMN
    } else {
        EIN_COLUMN
    }
}

/// Fill `990_PDF_URL` for every row from the cache; unmatched rows get an
/// empty string so the column is populated uniformly.
pub fn append_pdf_links(dataset: &mut Dataset, cache: &FilingCache) -> MatchReport {
    let key_column = ein_column(dataset);
    dataset.ensure_column(PDF_URL_COLUMN);

    let mut matched = 0;
    for row in 0..dataset.len() {
        let ein = dataset.get(row, key_column).to_string();
        let year = dataset.get(row, YEAR_COLUMN).trim().parse::<i32>().ok();

        let url = match year {
            Some(year) if !ein.is_empty() => cache.lookup(&ein, year).unwrap_or(""),
            _ => "",
        }
        .to_string();

        if !url.is_empty() {
            matched += 1;
        }
        dataset.set(row, PDF_URL_COLUMN, url);
    }

    MatchReport {
        matched,
        total: dataset.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing(year: i32, url: &str) -> Filing {
        Filing {
            tax_prd_yr: Some(serde_json::json!(year)),
            pdf_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn first_seen_wins_for_duplicate_years() {
        let mut cache = FilingCache::new();
        cache.insert_filings(
            "010215213",
            &[filing(2012, "https://x/with_data.pdf"), filing(2012, "https://x/scan.pdf")],
        );
        assert_eq!(
            cache.lookup("010215213", 2012),
            Some("https://x/with_data.pdf")
        );
        assert_eq!(cache.link_count(), 1);
    }

    #[test]
    fn filings_without_year_or_url_are_ignored() {
        let mut cache = FilingCache::new();
        let missing_url = Filing {
            tax_prd_yr: Some(serde_json::json!(2010)),
            ..Default::default()
        };
        let bad_year = Filing {
            tax_prd_yr: Some(serde_json::json!("n/a")),
            pdf_url: Some("https://x/a.pdf".to_string()),
            ..Default::default()
        };
        cache.insert_filings("1", &[missing_url, bad_year]);
        assert_eq!(cache.link_count(), 0);
        assert_eq!(cache.org_count(), 1);
    }

    #[test]
    fn join_fills_column_and_counts_matches() {
        let mut d = Dataset::new(vec![
            "Institution Name".to_string(),
            "EIN".to_string(),
            "Year".to_string(),
        ]);
        d.push_row(vec!["A".into(), "111".into(), "2012".into()]);
        d.push_row(vec!["B".into(), "222".into(), "2013".into()]);
        d.push_row(vec!["C".into(), "111".into(), "not-a-year".into()]);

        let mut cache = FilingCache::new();
        cache.insert_filings("111", &[filing(2012, "https://x/111.pdf")]);

        let report = append_pdf_links(&mut d, &cache);
        assert_eq!(report, MatchReport { matched: 1, total: 3 });
        assert_eq!(d.get(0, PDF_URL_COLUMN), "https://x/111.pdf");
        assert_eq!(d.get(1, PDF_URL_COLUMN), "");
        assert_eq!(d.get(2, PDF_URL_COLUMN), "");
    }

    #[test]
    fn join_prefers_corrected_ein_column() {
        let mut d = Dataset::new(vec![
            "EIN".to_string(),
            "Corrected_EIN".to_string(),
            "Year".to_string(),
        ]);
        d.push_row(vec!["999".into(), "111".into(), "2012".into()]);

        let mut cache = FilingCache::new();
        cache.insert_filings("111", &[filing(2012, "https://x/111.pdf")]);

        let report = append_pdf_links(&mut d, &cache);
        assert_eq!(report.matched, 1);
        assert_eq!(d.get(0, PDF_URL_COLUMN), "https://x/111.pdf");
    }

    #[test]
    fn coverage_percentage() {
        let report = MatchReport { matched: 3, total: 4 };
        assert!((report.coverage_pct() - 75.0).abs() < f64::EPSILON);
        let empty = MatchReport { matched: 0, total: 0 };
        assert_eq!(empty.coverage_pct(), 0.0);
    }
}
