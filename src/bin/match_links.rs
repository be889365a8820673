// Link matching: fetch filings for every distinct EIN in the input CSV,
// build the year -> PDF URL cache, and append a 990_PDF_URL column.

use std::time::Duration;

use anyhow::Result;
use form990scraper::{api, config::Config, dataset::Dataset, links};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Config::from_args()?;
    info!(input = %config.input_path().display(), "starting PDF link matching");

    let mut dataset = Dataset::read(config.input_path())?;
    let key_column = links::ein_column(&dataset);
    let eins = dataset.distinct_values(key_column);
    info!(
        rows = dataset.len(),
        eins = eins.len(),
        key_column,
        "read input"
    );

    let client = api::build_client()?;
    let cache = links::FilingCache::build(
        &client,
        &eins,
        Duration::from_millis(config.request_delay_ms),
    )
    .await;

    let report = links::append_pdf_links(&mut dataset, &cache);
    dataset.write(config.output_path())?;

    info!(
        matched = report.matched,
        total = report.total,
        coverage = format!("{:.2}%", report.coverage_pct()),
        output = %config.output_path().display(),
        "link matching complete"
    );
    Ok(())
}
