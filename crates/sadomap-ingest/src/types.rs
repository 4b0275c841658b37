//! Raw tabular data as delivered by a source, before any field mapping.

use serde::Deserialize;

/// One data row: ordered cell values, possibly ragged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow(Vec<String>);

impl RawRow {
    #[must_use]
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Cell at `index`, or `""` when the row is shorter.
    #[must_use]
    pub fn cell(&self, index: usize) -> &str {
        self.0.get(index).map_or("", String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when every cell is blank; such rows are padding, not data.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|c| c.trim().is_empty())
    }
}

impl<S: Into<String>> FromIterator<S> for RawRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A fetched sheet: the header row plus every data row below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetData {
    /// Split a value grid into header and data rows. Row 0 is the header.
    #[must_use]
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let headers = iter
            .next()
            .map(|h| h.into_iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = iter.map(RawRow::new).collect();
        Self { headers, rows }
    }

    /// 1-based spreadsheet row number of the data row at `index`
    /// (the header occupies row 1).
    #[must_use]
    pub fn row_number(index: usize) -> usize {
        index + 2
    }
}

/// Body of the Sheets `values.get` endpoint.
///
/// The API omits `values` entirely for an empty range.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    pub(crate) fn into_sheet(self) -> SheetData {
        let grid = self
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        SheetData::from_values(grid)
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => String::from(if b { "TRUE" } else { "FALSE" }),
        other => other.to_string(),
    }
}
