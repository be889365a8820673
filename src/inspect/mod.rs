// src/inspect/mod.rs
//
// Loads the per-filing summary spreadsheet and runs basic accounting sanity
// checks: the net-assets equation within a fixed tolerance, and no negative
// asset/liability/expense figures.

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use tracing::{info, warn};

pub const ASSETS_COLUMN: &str = "Total_Assets";
pub const LIABILITIES_COLUMN: &str = "Total_Liabilities";
pub const NET_ASSETS_COLUMN: &str = "Total_Net_Assets";
pub const EXPENSES_COLUMN: &str = "Total_Expenses";
pub const FILENAME_COLUMN: &str = "filename";
pub const ERROR_COLUMN: &str = "error";

/// Leeway for rounding in reported figures.
pub const NET_ASSETS_TOLERANCE: f64 = 1000.0;

/// One spreadsheet row. Fields mapped from absent columns stay `None`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SummaryRow {
    pub filename: String,
    pub error: Option<String>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_net_assets: Option<f64>,
    pub total_expenses: Option<f64>,
}

impl SummaryRow {
    /// A row counts as successfully extracted when assets are populated.
    pub fn is_successful(&self) -> bool {
        self.total_assets.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    /// |reported - (assets - liabilities)| exceeded the tolerance.
    NetAssetsMismatch {
        reported: f64,
        calculated: f64,
        diff: f64,
    },
    NegativeValue { field: &'static str, value: f64 },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::NetAssetsMismatch {
                reported,
                calculated,
                diff,
            } => write!(
                f,
                "Net Assets mismatch: Reported {} vs Calc {} (Diff: {})",
                reported, calculated, diff
            ),
            Anomaly::NegativeValue { field, value } => {
                write!(f, "{} is negative: {}", field, value)
            }
        }
    }
}

/// Run the anomaly checks on one row. The equation check needs assets,
/// liabilities, and the reported net figure all present.
pub fn check_row(row: &SummaryRow) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if let (Some(assets), Some(liabilities), Some(reported)) = (
        row.total_assets,
        row.total_liabilities,
        row.total_net_assets,
    ) {
        let calculated = assets - liabilities;
        let diff = reported - calculated;
        if diff.abs() > NET_ASSETS_TOLERANCE {
            anomalies.push(Anomaly::NetAssetsMismatch {
                reported,
                calculated,
                diff,
            });
        }
    }

    for (field, value) in [
        (ASSETS_COLUMN, row.total_assets),
        (LIABILITIES_COLUMN, row.total_liabilities),
        (EXPENSES_COLUMN, row.total_expenses),
    ] {
        if let Some(value) = value {
            if value < 0.0 {
                anomalies.push(Anomaly::NegativeValue { field, value });
            }
        }
    }

    anomalies
}

fn cell_number(cell: Option<&Data>) -> Option<f64> {
    let cell = cell?;
    if cell.is_empty() {
        return None;
    }
    cell.as_f64()
        .or_else(|| cell.as_string().and_then(|s| s.trim().parse::<f64>().ok()))
}

fn cell_string(cell: Option<&Data>) -> Option<String> {
    let cell = cell?;
    if cell.is_empty() {
        return None;
    }
    cell.as_string().filter(|s| !s.trim().is_empty())
}

/// Load the first worksheet of `path` into `SummaryRow`s, mapping named
/// columns from the header row. A missing expected column leaves that field
/// `None` for every row.
pub fn load_summary(path: impl AsRef<Path>) -> Result<Vec<SummaryRow>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("summary file not found: {}", path.display());
    }

    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("opening {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("no worksheet in workbook")?
        .with_context(|| format!("reading worksheet of {}", path.display()))?;

    let mut rows_iter = range.rows();
    let header = match rows_iter.next() {
        Some(header) => header,
        None => bail!("empty worksheet in {}", path.display()),
    };
    let col = |name: &str| -> Option<usize> {
        header
            .iter()
            .position(|c| c.as_string().map(|s| s.trim() == name).unwrap_or(false))
    };
    let columns = [
        FILENAME_COLUMN,
        ERROR_COLUMN,
        ASSETS_COLUMN,
        LIABILITIES_COLUMN,
        NET_ASSETS_COLUMN,
        EXPENSES_COLUMN,
    ]
    .map(|name| (name, col(name)));
    for (name, idx) in &columns {
        if idx.is_none() {
            warn!(column = name, "expected column missing from worksheet");
        }
    }
    let lookup = |name: &str| columns.iter().find(|(n, _)| *n == name).and_then(|(_, i)| *i);

    let (filename_col, error_col) = (lookup(FILENAME_COLUMN), lookup(ERROR_COLUMN));
    let (assets_col, liabilities_col) = (lookup(ASSETS_COLUMN), lookup(LIABILITIES_COLUMN));
    let (net_col, expenses_col) = (lookup(NET_ASSETS_COLUMN), lookup(EXPENSES_COLUMN));

    let mut rows = Vec::new();
    for raw in rows_iter {
        let at = |idx: Option<usize>| idx.and_then(|i| raw.get(i));
        rows.push(SummaryRow {
            filename: cell_string(at(filename_col)).unwrap_or_default(),
            error: cell_string(at(error_col)),
            total_assets: cell_number(at(assets_col)),
            total_liabilities: cell_number(at(liabilities_col)),
            total_net_assets: cell_number(at(net_col)),
            total_expenses: cell_number(at(expenses_col)),
        });
    }

    info!(path = %path.display(), rows = rows.len(), "loaded summary");
    Ok(rows)
}

/// Print the inspection report: counts, successful rows in detail, anomaly
/// findings, and the rows that carry an extraction error.
pub fn report(rows: &[SummaryRow]) {
    info!(total = rows.len(), "summary rows");

    let missing = |f: fn(&SummaryRow) -> bool| rows.iter().filter(|&r| f(r)).count();
    info!(
        assets = missing(|r| r.total_assets.is_none()),
        liabilities = missing(|r| r.total_liabilities.is_none()),
        net_assets = missing(|r| r.total_net_assets.is_none()),
        expenses = missing(|r| r.total_expenses.is_none()),
        "missing values per column"
    );

    let successful: Vec<(usize, &SummaryRow)> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_successful())
        .collect();
    info!(count = successful.len(), "successful rows");

    for (idx, row) in &successful {
        info!(
            row = idx,
            filename = %row.filename,
            assets = ?row.total_assets,
            liabilities = ?row.total_liabilities,
            net_assets = ?row.total_net_assets,
            expenses = ?row.total_expenses,
            "successful row"
        );
        let anomalies = check_row(row);
        if anomalies.is_empty() {
            info!(row = idx, "no obvious anomalies found");
        } else {
            for anomaly in &anomalies {
                warn!(row = idx, "{}", anomaly);
            }
        }
    }

    let errored: Vec<(usize, &SummaryRow)> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.error.is_some())
        .collect();
    info!(count = errored.len(), "rows with extraction errors");
    for (idx, row) in errored {
        warn!(row = idx, filename = %row.filename, error = %row.error.as_deref().unwrap_or(""), "extraction error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(assets: f64, liabilities: f64, net: f64) -> SummaryRow {
        SummaryRow {
            filename: "2012_Form990.pdf".to_string(),
            total_assets: Some(assets),
            total_liabilities: Some(liabilities),
            total_net_assets: Some(net),
            total_expenses: Some(10.0),
            ..Default::default()
        }
    }

    #[test]
    fn small_rounding_diff_is_within_tolerance() {
        // 100 - 40 = 60 calculated; reported 61 differs by 1, under 1000.
        assert!(check_row(&row(100.0, 40.0, 61.0)).is_empty());
    }

    #[test]
    fn large_diff_is_flagged() {
        let anomalies = check_row(&row(100.0, 40.0, 2000.0));
        assert_eq!(
            anomalies,
            vec![Anomaly::NetAssetsMismatch {
                reported: 2000.0,
                calculated: 60.0,
                diff: 1940.0
            }]
        );
    }

    #[test]
    fn negative_fields_are_flagged() {
        let r = SummaryRow {
            total_assets: Some(-5.0),
            total_liabilities: Some(3.0),
            total_expenses: Some(-1.0),
            ..Default::default()
        };
        let anomalies = check_row(&r);
        assert_eq!(
            anomalies,
            vec![
                Anomaly::NegativeValue {
                    field: ASSETS_COLUMN,
                    value: -5.0
                },
                Anomaly::NegativeValue {
                    field: EXPENSES_COLUMN,
                    value: -1.0
                },
            ]
        );
    }

    #[test]
    fn equation_check_needs_all_three_figures() {
        let r = SummaryRow {
            total_assets: Some(100.0),
            total_net_assets: Some(999999.0),
            ..Default::default()
        };
        assert!(check_row(&r).is_empty());
    }

    #[test]
    fn successful_means_assets_populated() {
        assert!(!SummaryRow::default().is_successful());
        assert!(row(1.0, 0.0, 1.0).is_successful());
    }
}
