//! Structured data-quality and failure events.
//!
//! The pipeline never decides where logs go. It hands [`IngestEvent`]s to an
//! injected [`EventSink`]; [`TracingSink`] forwards them to `tracing`, and
//! [`RecordingSink`] keeps them in memory for assertions.

use std::sync::{Mutex, PoisonError};

use sadomap_core::{AreaId, Coordinates, Field};

use crate::coords::CoordinateIssue;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    /// A row was skipped because it has no name.
    RowRejected {
        area: AreaId,
        row: usize,
        reason: String,
    },
    /// Coordinates were missing or invalid; the default was substituted.
    CoordinateFallback {
        area: AreaId,
        row: usize,
        poi: String,
        raw: String,
        issue: CoordinateIssue,
    },
    /// Coordinates are valid but outside the configured region.
    CoordinateOutsideRegion {
        area: AreaId,
        row: usize,
        poi: String,
        coordinates: Coordinates,
    },
    /// Header names from the layout that the sheet does not have.
    UnresolvedColumns { area: AreaId, fields: Vec<Field> },
    /// Ids seen more than once while merging; the later POI was kept.
    DuplicateIds { count: usize, ids: Vec<String> },
    /// An area could not be ingested.
    AreaFailed {
        area: AreaId,
        attempts: u32,
        error: String,
    },
}

/// Receiver for pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: IngestEvent);
}

/// Forwards events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: IngestEvent) {
        match event {
            IngestEvent::RowRejected { area, row, reason } => {
                tracing::warn!(%area, row, %reason, "row rejected");
            }
            IngestEvent::CoordinateFallback {
                area,
                row,
                poi,
                raw,
                issue,
            } => {
                tracing::warn!(
                    %area,
                    row,
                    %poi,
                    %raw,
                    ?issue,
                    "invalid coordinates; using default"
                );
            }
            IngestEvent::CoordinateOutsideRegion {
                area,
                row,
                poi,
                coordinates,
            } => {
                tracing::warn!(
                    %area,
                    row,
                    %poi,
                    lat = coordinates.lat,
                    lng = coordinates.lng,
                    "coordinates outside region"
                );
            }
            IngestEvent::UnresolvedColumns { area, fields } => {
                tracing::warn!(%area, ?fields, "sheet lacks mapped headers");
            }
            IngestEvent::DuplicateIds { count, ids } => {
                tracing::warn!(count, ?ids, "duplicate POI ids; later rows win");
            }
            IngestEvent::AreaFailed {
                area,
                attempts,
                error,
            } => {
                tracing::error!(%area, attempts, %error, "area ingestion failed");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<IngestEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<IngestEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: IngestEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
