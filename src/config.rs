// src/config.rs
//
// All knobs the workflow binaries share, loadable from a YAML file. Every
// binary takes an optional config path as its single positional argument;
// missing fields fall back to the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory that input/output CSVs and the download tree live under.
    pub base_dir: PathBuf,
    /// Input CSV for the current step.
    pub input_csv: PathBuf,
    /// Output CSV for the current step.
    pub output_csv: PathBuf,
    /// Root directory for downloaded PDFs.
    pub download_dir: PathBuf,
    /// XLSX summary file for inspection.
    pub summary_xlsx: PathBuf,

    /// EINs for the per-organization downloader.
    pub ein_list: Vec<String>,
    /// Inclusive tax-year range for the per-organization downloader.
    pub start_year: i32,
    pub end_year: i32,

    /// Delay between API requests (EIN fetches, name searches).
    pub request_delay_ms: u64,
    /// Delay after each successful PDF download.
    pub download_delay_ms: u64,
    /// Delay between organizations in the per-EIN downloader.
    pub org_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            input_csv: PathBuf::from("unique_eins.csv"),
            output_csv: PathBuf::from("unique_eins_out.csv"),
            download_dir: PathBuf::from("downloaded_990s"),
            summary_xlsx: PathBuf::from("single_university_summary.xlsx"),
            ein_list: Vec::new(),
            start_year: 2000,
            end_year: 2018,
            request_delay_ms: 200,
            download_delay_ms: 500,
            org_delay_ms: 1000,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load from the first CLI argument if given, else defaults.
    pub fn from_args() -> Result<Self> {
        match std::env::args().nth(1) {
            Some(path) => {
                info!(config = %path, "loading config");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Inclusive tax-year window for the per-organization downloader.
    pub fn year_in_range(&self, year: i32) -> bool {
        self.start_year <= year && year <= self.end_year
    }

    pub fn input_path(&self) -> PathBuf {
        self.base_dir.join(&self.input_csv)
    }

    pub fn output_path(&self) -> PathBuf {
        self.base_dir.join(&self.output_csv)
    }

    pub fn download_root(&self) -> PathBuf {
        self.base_dir.join(&self.download_dir)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.base_dir.join(&self.summary_xlsx)
    }
}
