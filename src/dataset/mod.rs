// src/dataset/mod.rs
//
// Ordered CSV table with named columns. Row and column order are preserved
// exactly on write; new columns pad every existing row with empty strings.

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file. The input file must exist and carry a header row;
    /// a UTF-8 BOM on the first header cell is stripped.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("input file not found: {}", path.display());
        }
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let mut headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("reading header row of {}", path.display()))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.is_empty() {
            bail!("empty CSV or no headers in {}", path.display());
        }
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("reading record from {}", path.display()))?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        info!(path = %path.display(), rows = rows.len(), cols = width, "read CSV");
        Ok(Self { headers, rows })
    }

    /// Write the table back out, header first, rows in original order.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer
            .write_record(&self.headers)
            .context("writing header row")?;
        for row in &self.rows {
            writer.write_record(row).context("writing row")?;
        }
        writer.flush().context("flushing CSV writer")?;
        info!(path = %path.display(), rows = self.rows.len(), "wrote CSV");
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a column unless it already exists. Existing rows are padded.
    /// Returns the column's index either way.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        self.insert_column(self.headers.len(), name)
    }

    /// Insert a column at `at` (clamped to the header width) unless it
    /// already exists. Returns the column's index either way.
    pub fn insert_column(&mut self, at: usize, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        let at = at.min(self.headers.len());
        self.headers.insert(at, name.to_string());
        for row in &mut self.rows {
            row.insert(at, String::new());
        }
        at
    }

    /// Cell by row index and column name; absent column or cell reads as "".
    pub fn get(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set a cell; the column must exist (use `ensure_column` first).
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) {
        if let Some(c) = self.column_index(column) {
            if let Some(r) = self.rows.get_mut(row) {
                if let Some(cell) = r.get_mut(c) {
                    *cell = value.into();
                }
            }
        }
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Distinct non-empty values of one column, in first-appearance order.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in 0..self.len() {
            let v = self.get(row, column);
            if !v.is_empty() && seen.insert(v.to_string()) {
                out.push(v.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> Dataset {
        let mut d = Dataset::new(vec![
            "Institution Name".to_string(),
            "EIN".to_string(),
            "Year".to_string(),
        ]);
        d.push_row(vec![
            "Example College".to_string(),
            "010215213".to_string(),
            "2012".to_string(),
        ]);
        d.push_row(vec![
            "Sample University".to_string(),
            "135600077".to_string(),
            "2013".to_string(),
        ]);
        d
    }

    #[test]
    fn round_trip_preserves_order() {
        let d = sample();
        let tmp = NamedTempFile::new().unwrap();
        d.write(tmp.path()).unwrap();

        let back = Dataset::read(tmp.path()).unwrap();
        assert_eq!(back.headers(), d.headers());
        assert_eq!(back.len(), 2);
        assert_eq!(back.get(0, "Institution Name"), "Example College");
        assert_eq!(back.get(1, "Year"), "2013");
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "\u{feff}EIN,Year\n010215213,2012\n").unwrap();

        let d = Dataset::read(f.path()).unwrap();
        assert_eq!(d.headers(), &["EIN".to_string(), "Year".to_string()]);
        assert_eq!(d.get(0, "EIN"), "010215213");
    }

    #[test]
    fn ensure_column_is_idempotent_and_pads_rows() {
        let mut d = sample();
        let idx = d.ensure_column("990_PDF_URL");
        assert_eq!(idx, 3);
        assert_eq!(d.get(0, "990_PDF_URL"), "");

        let again = d.ensure_column("990_PDF_URL");
        assert_eq!(again, idx);
        assert_eq!(d.headers().len(), 4);
    }

    #[test]
    fn insert_column_shifts_cells() {
        let mut d = sample();
        d.insert_column(1, "Corrected_EIN");
        assert_eq!(d.headers()[1], "Corrected_EIN");
        assert_eq!(d.get(0, "EIN"), "010215213");
        assert_eq!(d.get(0, "Corrected_EIN"), "");
    }

    #[test]
    fn missing_input_file_is_fatal() {
        let err = Dataset::read("/no/such/file.csv").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn distinct_values_skips_blanks_and_dupes() {
        let mut d = sample();
        d.push_row(vec![
            "Example College".to_string(),
            "010215213".to_string(),
            "2014".to_string(),
        ]);
        d.push_row(vec!["No EIN Org".to_string(), String::new(), String::new()]);
        assert_eq!(
            d.distinct_values("EIN"),
            vec!["010215213".to_string(), "135600077".to_string()]
        );
    }
}
