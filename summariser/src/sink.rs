use crate::model::Row;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A destination for report rows, grouped into named worksheets.
pub trait ReportSink {
    type Error;

    /// Append `rows` after any rows already in `worksheet`.
    fn append_rows(&mut self, worksheet: &str, rows: &[Row]) -> Result<(), Self::Error>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    type Error = S::Error;

    fn append_rows(&mut self, worksheet: &str, rows: &[Row]) -> Result<(), Self::Error> {
        (**self).append_rows(worksheet, rows)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write worksheet {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize row: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A [ReportSink] that writes each worksheet to `<dir>/<worksheet>.jsonl`, one JSON array per
/// row.
#[derive(Debug)]
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The file a worksheet is written to.
    pub fn worksheet_path(&self, worksheet: &str) -> PathBuf {
        self.dir.join(format!("{worksheet}.jsonl"))
    }

    fn open(&self, path: &Path) -> Result<File, SinkError> {
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(path))
            .map_err(|source| SinkError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl ReportSink for JsonlSink {
    type Error = SinkError;

    fn append_rows(&mut self, worksheet: &str, rows: &[Row]) -> Result<(), Self::Error> {
        let path = self.worksheet_path(worksheet);
        log::debug!("Appending {} rows to {}", rows.len(), path.display());

        let mut writer = BufWriter::new(self.open(&path)?);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writeln!(writer).map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| SinkError::Io { path, source })
    }
}

/// A [ReportSink] that keeps every worksheet in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    worksheets: BTreeMap<String, Vec<Row>>,
}

impl MemorySink {
    /// Rows written to `worksheet` so far, in write order.
    pub fn rows(&self, worksheet: &str) -> &[Row] {
        self.worksheets
            .get(worksheet)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    type Error = std::convert::Infallible;

    fn append_rows(&mut self, worksheet: &str, rows: &[Row]) -> Result<(), Self::Error> {
        self.worksheets
            .entry(worksheet.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }
}
