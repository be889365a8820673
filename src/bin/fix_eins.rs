// EIN correction: for every distinct institution name in the input CSV,
// search ProPublica and take the top hit's EIN and name. Rows whose name
// finds no match keep their original EIN and get the NOT_FOUND sentinel.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use form990scraper::{
    api::{self, FetchOutcome},
    config::Config,
    dataset::Dataset,
    links::{CORRECTED_EIN_COLUMN, EIN_COLUMN},
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const NAME_COLUMN: &str = "Institution Name";
const FOUND_NAME_COLUMN: &str = "ProPublica_Name";
const NOT_FOUND: &str = "NOT_FOUND";

#[derive(Debug, PartialEq, Eq)]
struct Correction {
    ein: String,
    found_name: String,
}

/// A search with no usable hit (or a failed fetch) keeps the original EIN
/// and marks the found-name column with the NOT_FOUND sentinel.
fn decide_correction(
    outcome: FetchOutcome<form990scraper::api::types::SearchResponse>,
    original_ein: &str,
) -> Correction {
    if let FetchOutcome::Found(resp) = &outcome {
        if let Some(hit) = resp.top_match() {
            if let Some(ein) = hit.ein {
                return Correction {
                    ein: ein.to_string(),
                    found_name: hit.name.clone().unwrap_or_default(),
                };
            }
        }
    }
    Correction {
        ein: original_ein.to_string(),
        found_name: NOT_FOUND.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Config::from_args()?;
    info!(input = %config.input_path().display(), "starting EIN correction");

    let mut dataset = Dataset::read(config.input_path())?;

    // Distinct name -> original EIN; last row wins for duplicate names.
    let mut originals: HashMap<String, String> = HashMap::new();
    for row in 0..dataset.len() {
        let name = dataset.get(row, NAME_COLUMN);
        if !name.is_empty() {
            originals.insert(name.to_string(), dataset.get(row, EIN_COLUMN).to_string());
        }
    }
    info!(institutions = originals.len(), "distinct institutions to search");

    let client = api::build_client()?;
    let mut corrections: HashMap<String, Correction> = HashMap::new();

    let mut names: Vec<&String> = originals.keys().collect();
    names.sort();
    let total = names.len();

    for (i, name) in names.into_iter().enumerate() {
        info!("searching [{}/{}]: {}", i + 1, total, name);

        let outcome = api::search_organizations(&client, name).await;
        if let FetchOutcome::Failed(failure) = &outcome {
            warn!(%name, %failure, "search failed, keeping original EIN");
        }
        corrections.insert(name.to_string(), decide_correction(outcome, &originals[name]));

        sleep(Duration::from_millis(config.request_delay_ms)).await;
    }
    info!(searched = total, "finished searching");

    // Corrected_EIN slots in right after the original EIN column.
    dataset.insert_column(1, CORRECTED_EIN_COLUMN);
    dataset.ensure_column(FOUND_NAME_COLUMN);

    for row in 0..dataset.len() {
        let name = dataset.get(row, NAME_COLUMN).to_string();
        match corrections.get(&name) {
            Some(c) => {
                let (ein, found) = (c.ein.clone(), c.found_name.clone());
                dataset.set(row, CORRECTED_EIN_COLUMN, ein);
                dataset.set(row, FOUND_NAME_COLUMN, found);
            }
            None => {
                let original = dataset.get(row, EIN_COLUMN).to_string();
                dataset.set(row, CORRECTED_EIN_COLUMN, original);
                dataset.set(row, FOUND_NAME_COLUMN, "");
            }
        }
    }

    dataset.write(config.output_path())?;
    info!(output = %config.output_path().display(), "EIN correction complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form990scraper::api::{types::SearchResponse, FetchFailure};

    #[test]
    fn top_hit_becomes_the_corrected_ein() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"organizations": [
                {"ein": 42103580, "name": "EXAMPLE INSTITUTE"},
                {"ein": 99999999, "name": "SECOND HIT"}
            ]}"#,
        )
        .unwrap();
        let c = decide_correction(FetchOutcome::Found(resp), "135600077");
        assert_eq!(
            c,
            Correction {
                ein: "42103580".to_string(),
                found_name: "EXAMPLE INSTITUTE".to_string()
            }
        );
    }

    #[test]
    fn empty_result_preserves_original_ein() {
        let resp = SearchResponse::default();
        let c = decide_correction(FetchOutcome::Found(resp), "135600077");
        assert_eq!(
            c,
            Correction {
                ein: "135600077".to_string(),
                found_name: NOT_FOUND.to_string()
            }
        );
    }

    #[test]
    fn failed_search_preserves_original_ein() {
        let c = decide_correction(
            FetchOutcome::Failed(FetchFailure::Status(500)),
            "135600077",
        );
        assert_eq!(c.ein, "135600077");
        assert_eq!(c.found_name, NOT_FOUND);
    }
}
