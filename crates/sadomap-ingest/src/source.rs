//! Source readers: where raw rows for an area come from.
//!
//! A reader performs exactly one fetch per call and never caches; retry and
//! caching are layered on top by the store.

use std::path::PathBuf;

use async_trait::async_trait;
use sadomap_core::AreaConfig;

use crate::error::IngestError;
use crate::types::SheetData;

/// Fetches the raw sheet behind one area.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch header and data rows for `area`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] describing the transport, status, or parse
    /// failure. Classification into transient/permanent is the caller's job.
    async fn fetch(&self, area: &AreaConfig) -> Result<SheetData, IngestError>;
}

/// Parse delimited text into a [`SheetData`]. The first record is the header.
///
/// Records may be ragged; a UTF-8 byte-order mark on the first cell is
/// dropped.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the text is not valid CSV.
pub fn parse_csv(text: &str, context: &str) -> Result<SheetData, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Csv {
            context: context.to_owned(),
            source: e,
        })?;
        grid.push(record.iter().map(str::to_owned).collect());
    }

    Ok(SheetData::from_values(grid))
}

/// Reads `<dir>/<sheet>.csv` for each area. Used for offline runs and exports.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, area: &AreaConfig) -> PathBuf {
        self.dir.join(format!("{}.csv", area.sheet))
    }
}

#[async_trait]
impl SourceReader for CsvDirSource {
    async fn fetch(&self, area: &AreaConfig) -> Result<SheetData, IngestError> {
        let path = self.path_for(area);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| IngestError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        parse_csv(&text, &path.display().to_string())
    }
}
