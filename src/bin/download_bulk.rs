// Bulk downloader: walk the matched CSV and fetch every row's 990 PDF into
// an organization-scoped folder, skipping files a previous run completed.

use std::time::Duration;

use anyhow::Result;
use form990scraper::{
    api,
    config::Config,
    dataset::Dataset,
    download::{self, names, DownloadOutcome},
    links::{self, PDF_URL_COLUMN, YEAR_COLUMN},
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const NAME_COLUMN: &str = "Institution Name";

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Config::from_args()?;
    info!(input = %config.input_path().display(), "starting bulk PDF download");

    let dataset = Dataset::read(config.input_path())?;
    let key_column = links::ein_column(&dataset);

    let rows_with_links: Vec<usize> = (0..dataset.len())
        .filter(|&row| !dataset.get(row, PDF_URL_COLUMN).trim().is_empty())
        .collect();
    let total = rows_with_links.len();
    info!(total, "rows with PDF links");

    let download_root = config.download_root();
    std::fs::create_dir_all(&download_root)?;

    let client = api::build_client()?;
    let mut stats = download::DownloadStats::default();

    for (i, row) in rows_with_links.into_iter().enumerate() {
        let ein = dataset.get(row, key_column);
        let year = dataset.get(row, YEAR_COLUMN);
        let name = dataset.get(row, NAME_COLUMN);
        let url = dataset.get(row, PDF_URL_COLUMN).trim().to_string();

        let folder = download_root.join(names::org_folder(ein, name));
        let dest = folder.join(names::bulk_filename(year, &url));

        info!("[{}/{}] {} ({}) - {}", i + 1, total, ein, year, name);

        let result = download::fetch_pdf(&client, &url, &dest).await;
        match &result {
            Ok(DownloadOutcome::Downloaded) => {
                info!("DONE");
                sleep(Duration::from_millis(config.download_delay_ms)).await;
            }
            Ok(DownloadOutcome::AlreadyPresent) => info!("SKIPPED (exists)"),
            Err(e) => warn!(%url, error = %e, "FAILED"),
        }
        stats.record(&result);
    }

    stats.log_summary();
    info!(dir = %download_root.display(), "bulk download complete");
    Ok(())
}
