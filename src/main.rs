use std::time::Duration;

use anyhow::Result;
use form990scraper::{
    api::{self, FetchOutcome},
    config::Config,
    download::{self, names},
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) load config ──────────────────────────────────────────────
    let config = Config::from_args()?;
    info!(
        orgs = config.ein_list.len(),
        start_year = config.start_year,
        end_year = config.end_year,
        "starting per-organization download run"
    );
    let download_root = config.download_root();
    std::fs::create_dir_all(&download_root)?;

    let client = api::build_client()?;
    let mut stats = download::DownloadStats::default();

    // ─── 3) one organization at a time ───────────────────────────────
    for ein in &config.ein_list {
        info!(%ein, "processing organization");

        let resp = match api::get_filings(&client, &api::clean_ein(ein)).await {
            FetchOutcome::Found(resp) => resp,
            FetchOutcome::NotFound => {
                info!(%ein, "no data for EIN");
                continue;
            }
            FetchOutcome::Failed(failure) => {
                warn!(%ein, %failure, "fetch failed, skipping organization");
                continue;
            }
        };
        info!(organization = resp.org_name(), "fetched filings");

        let org_dir = download_root.join(ein);
        let mut org_downloads = 0usize;

        for filing in resp.all_filings() {
            let (Some(year), Some(url)) = (filing.tax_year(), filing.pdf_link()) else {
                continue;
            };
            if !config.year_in_range(year) {
                continue;
            }

            let form_type = names::form_type_for(filing.formtype_str.as_deref(), url);
            let filename = names::filing_filename(year, &form_type, filing.tax_prd_id);
            let dest = org_dir.join(&filename);

            let result = download::fetch_pdf(&client, url, &dest).await;
            match &result {
                Ok(download::DownloadOutcome::Downloaded) => {
                    info!(%filename, "downloaded");
                    org_downloads += 1;
                    sleep(Duration::from_millis(config.download_delay_ms)).await;
                }
                Ok(download::DownloadOutcome::AlreadyPresent) => {
                    info!(%filename, "already exists, skipping");
                }
                Err(e) => {
                    warn!(%url, error = %e, "download failed");
                }
            }
            stats.record(&result);
        }

        info!(%ein, downloaded = org_downloads, "finished organization");
        sleep(Duration::from_millis(config.org_delay_ms)).await;
    }

    // ─── 4) summary ──────────────────────────────────────────────────
    stats.log_summary();
    info!("all operations complete");
    Ok(())
}
