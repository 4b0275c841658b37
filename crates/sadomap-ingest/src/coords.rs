//! Coordinate resolver.
//!
//! Reads a row's position via the area's [`CoordinateSource`], validates it,
//! and substitutes the configured default when it is unusable. Resolution
//! never fails: a named POI is never lost to a bad coordinate.

use std::sync::LazyLock;

use regex::Regex;
use sadomap_core::{AreaId, BoundingBox, CoordinateSource, Coordinates, Field};

use crate::columns::ColumnMap;
use crate::events::{EventSink, IngestEvent};
use crate::types::RawRow;

static POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)POINT\s*\(\s*([^\s()]+)\s+([^\s()]+)\s*\)").expect("valid WKT point regex")
});

/// Why a row's coordinates were replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateIssue {
    /// The coordinate cell(s) are blank.
    Missing,
    /// Present but not a WKT point or not numeric.
    Malformed,
    /// Numeric but non-finite or outside `[-90, 90] × [-180, 180]`.
    OutOfRange,
}

/// Parse `POINT (lng lat)`. Returns the numbers as written, without range
/// validation.
#[must_use]
pub fn parse_wkt_point(text: &str) -> Option<Coordinates> {
    let caps = POINT_RE.captures(text)?;
    let lng = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let lat = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(Coordinates::new(lat, lng))
}

/// Where in the sheet a row came from, for log context.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub area: &'a AreaId,
    pub row: usize,
    pub poi: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinateResolver {
    source: CoordinateSource,
    fallback: Coordinates,
    region: Option<BoundingBox>,
}

impl CoordinateResolver {
    #[must_use]
    pub fn new(source: CoordinateSource, fallback: Coordinates, region: Option<BoundingBox>) -> Self {
        Self {
            source,
            fallback,
            region,
        }
    }

    /// Read and validate the row's coordinates without substituting.
    ///
    /// # Errors
    ///
    /// Returns the [`CoordinateIssue`] that makes the value unusable.
    pub fn extract(&self, map: &ColumnMap, row: &RawRow) -> Result<Coordinates, CoordinateIssue> {
        let point = match self.source {
            CoordinateSource::Wkt => {
                let cell = map.get(row, Field::Wkt);
                if cell.is_empty() {
                    return Err(CoordinateIssue::Missing);
                }
                parse_wkt_point(cell).ok_or(CoordinateIssue::Malformed)?
            }
            CoordinateSource::Columns => {
                let lat = map.get(row, Field::Latitude);
                let lng = map.get(row, Field::Longitude);
                if lat.is_empty() || lng.is_empty() {
                    return Err(CoordinateIssue::Missing);
                }
                match (lat.parse::<f64>(), lng.parse::<f64>()) {
                    (Ok(lat), Ok(lng)) => Coordinates::new(lat, lng),
                    _ => return Err(CoordinateIssue::Malformed),
                }
            }
        };

        if point.is_valid() {
            Ok(point)
        } else {
            Err(CoordinateIssue::OutOfRange)
        }
    }

    /// Resolve the row's coordinates, falling back to the default and
    /// reporting through `sink` when they are unusable or suspicious.
    pub fn resolve(
        &self,
        map: &ColumnMap,
        row: &RawRow,
        at: RowRef<'_>,
        sink: &dyn EventSink,
    ) -> Coordinates {
        match self.extract(map, row) {
            Ok(point) => {
                if let Some(region) = &self.region {
                    if !region.contains(point) {
                        sink.emit(IngestEvent::CoordinateOutsideRegion {
                            area: at.area.clone(),
                            row: at.row,
                            poi: at.poi.to_owned(),
                            coordinates: point,
                        });
                    }
                }
                point
            }
            Err(issue) => {
                sink.emit(IngestEvent::CoordinateFallback {
                    area: at.area.clone(),
                    row: at.row,
                    poi: at.poi.to_owned(),
                    raw: self.raw_value(map, row),
                    issue,
                });
                self.fallback
            }
        }
    }

    fn raw_value(&self, map: &ColumnMap, row: &RawRow) -> String {
        match self.source {
            CoordinateSource::Wkt => map.get(row, Field::Wkt).to_owned(),
            CoordinateSource::Columns => format!(
                "{},{}",
                map.get(row, Field::Latitude),
                map.get(row, Field::Longitude)
            ),
        }
    }
}
