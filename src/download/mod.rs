// src/download/mod.rs
//
// Streaming PDF download with skip-if-present semantics, plus the run-level
// success/skip/failure tally.

pub mod names;

use std::path::Path;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

/// What happened to one PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Body was streamed to disk.
    Downloaded,
    /// A non-empty file was already at the destination; no request issued.
    AlreadyPresent,
}

/// Accumulated counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DownloadStats {
    pub fn record(&mut self, result: &Result<DownloadOutcome>) {
        match result {
            Ok(DownloadOutcome::Downloaded) => self.downloaded += 1,
            Ok(DownloadOutcome::AlreadyPresent) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn log_summary(&self) {
        info!(
            downloaded = self.downloaded,
            skipped = self.skipped,
            failed = self.failed,
            "download run complete"
        );
    }
}

/// True when a previous run already left a usable file here. Zero-byte files
/// are failed downloads and do not count.
pub fn already_present(path: &Path) -> bool {
    path.metadata().map(|m| m.len() > 0).unwrap_or(false)
}

/// Download `url` to `dest`, streaming the body in chunks. Returns
/// `AlreadyPresent` without touching the network when the destination
/// already holds a non-empty file. Parent directories are created.
pub async fn fetch_pdf(client: &Client, url: &str, dest: &Path) -> Result<DownloadOutcome> {
    if already_present(dest) {
        debug!(path = %dest.display(), "already present, skipping");
        return Ok(DownloadOutcome::AlreadyPresent);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?;

    let mut file = fs::File::create(dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("reading body from {}", url))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", dest.display()))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .with_context(|| format!("flushing {}", dest.display()))?;

    debug!(path = %dest.display(), bytes = written, "saved");
    Ok(DownloadOutcome::Downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_client;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn empty_file_does_not_count_as_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2012_Form990.pdf");
        std::fs::File::create(&path).unwrap();
        assert!(!already_present(&path));

        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        assert!(already_present(&path));
        assert!(!already_present(&dir.path().join("missing.pdf")));
    }

    #[tokio::test]
    async fn existing_file_short_circuits_before_any_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2012_Form990.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        // An unroutable URL proves no request is attempted.
        let client = build_client().unwrap();
        let outcome = fetch_pdf(&client, "http://0.0.0.0:1/never.pdf", &path)
            .await
            .unwrap();
        assert_eq!(outcome, DownloadOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn stats_tally_each_outcome() {
        let mut stats = DownloadStats::default();
        stats.record(&Ok(DownloadOutcome::Downloaded));
        stats.record(&Ok(DownloadOutcome::AlreadyPresent));
        stats.record(&Err(anyhow::anyhow!("boom")));
        assert_eq!(
            stats,
            DownloadStats {
                downloaded: 1,
                skipped: 1,
                failed: 1
            }
        );
    }
}
