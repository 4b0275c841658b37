//! Ingestion pipeline turning spreadsheet rows into validated POI records.
//!
//! Flow per area: [`retry::retry_with_backoff`] drives a [`SourceReader`],
//! [`ColumnMap`] resolves cells, [`CoordinateResolver`] and [`classify`]
//! derive geometry and categories, [`Normalizer`] validates and assembles
//! each [`sadomap_core::Poi`], and [`PoiStore`] caches and merges areas.

pub mod classify;
pub mod client;
pub mod columns;
pub mod coords;
pub mod error;
pub mod events;
pub mod normalize;
pub mod retry;
pub mod source;
pub mod store;
pub mod types;

pub use classify::{classify, is_truthy, CategoryFlags};
pub use client::SheetsClient;
pub use columns::ColumnMap;
pub use coords::{parse_wkt_point, CoordinateIssue, CoordinateResolver, RowRef};
pub use error::{AreaError, AreaErrorKind, IngestError, RowValidationError};
pub use events::{EventSink, IngestEvent, RecordingSink, TracingSink};
pub use normalize::Normalizer;
pub use retry::{FetchState, RetryPolicy};
pub use source::{parse_csv, CsvDirSource, SourceReader};
pub use store::{PoiBatch, PoiStore};
pub use types::{RawRow, SheetData};
