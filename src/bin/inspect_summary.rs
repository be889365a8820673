// Spreadsheet inspection: load the extraction summary workbook and report
// descriptive counts plus accounting-equation anomalies.

use anyhow::Result;
use form990scraper::{config::Config, inspect};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Config::from_args()?;
    let rows = inspect::load_summary(config.summary_path())?;
    inspect::report(&rows);
    Ok(())
}
