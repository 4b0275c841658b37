//! Entity validator: turns mapped rows into [`Poi`] records.
//!
//! The only hard rejection is a missing name. Everything else falls back to
//! an empty value, the area's default kind, or the catalog's default
//! coordinates.

use std::sync::atomic::{AtomicU64, Ordering};

use sadomap_core::{
    AreaCatalog, AreaConfig, BoundingBox, BusinessHours, Category, ColumnLayout,
    CoordinateSource, Coordinates, Field, IdStrategy, Poi, PoiFlags, PoiKind,
};

use crate::classify::{classify, is_truthy, CategoryFlags};
use crate::columns::ColumnMap;
use crate::coords::{CoordinateResolver, RowRef};
use crate::error::{IngestError, RowValidationError};
use crate::events::{EventSink, IngestEvent};
use crate::types::{RawRow, SheetData};

/// Builds POIs for any area of one catalog.
///
/// Holds the `name_counter` id sequence, so one instance should be shared by
/// every area of a pipeline.
#[derive(Debug)]
pub struct Normalizer {
    default_coordinates: Coordinates,
    region: Option<BoundingBox>,
    counter: AtomicU64,
}

impl Normalizer {
    #[must_use]
    pub fn new(default_coordinates: Coordinates, region: Option<BoundingBox>) -> Self {
        Self {
            default_coordinates,
            region,
            counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn for_catalog(catalog: &AreaCatalog) -> Self {
        Self::new(catalog.default_coordinates, catalog.region)
    }

    /// Normalize every data row of `sheet`.
    ///
    /// An empty range (no header row, no data) yields no POIs. Blank rows are
    /// skipped silently; rows without a name are skipped with a
    /// [`IngestEvent::RowRejected`]. Output keeps sheet row order.
    ///
    /// Missing headers for the name or coordinate columns are reported as
    /// [`IngestEvent::UnresolvedColumns`]; other absent optional columns are
    /// only logged at debug level.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingColumn`] when a header layout cannot find
    /// the name column, since no row of that sheet could be accepted.
    pub fn normalize_sheet(
        &self,
        area: &AreaConfig,
        sheet: &SheetData,
        sink: &dyn EventSink,
    ) -> Result<Vec<Poi>, IngestError> {
        if sheet.headers.is_empty() && sheet.rows.is_empty() {
            tracing::debug!(area = %area.id, "empty sheet");
            return Ok(Vec::new());
        }

        let map = ColumnMap::resolve(&area.columns, &sheet.headers);

        let (required, optional): (Vec<Field>, Vec<Field>) = map
            .unresolved()
            .iter()
            .copied()
            .partition(|f| required_fields(area.coordinates).contains(f));
        if !optional.is_empty() {
            tracing::debug!(area = %area.id, fields = ?optional, "optional columns absent");
        }
        if !required.is_empty() {
            sink.emit(IngestEvent::UnresolvedColumns {
                area: area.id.clone(),
                fields: required,
            });
        }
        if !map.has(Field::Name) {
            return Err(IngestError::MissingColumn {
                sheet: area.sheet.clone(),
                header: header_for(&area.columns, Field::Name),
            });
        }

        let resolver =
            CoordinateResolver::new(area.coordinates, self.default_coordinates, self.region);

        let mut pois = Vec::with_capacity(sheet.rows.len());
        for (idx, row) in sheet.rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            let row_number = SheetData::row_number(idx);
            match self.normalize_row(area, &map, &resolver, row, row_number, sink) {
                Ok(poi) => pois.push(poi),
                Err(err) => sink.emit(IngestEvent::RowRejected {
                    area: area.id.clone(),
                    row: row_number,
                    reason: err.to_string(),
                }),
            }
        }

        tracing::debug!(
            area = %area.id,
            rows = sheet.rows.len(),
            accepted = pois.len(),
            "normalized sheet"
        );
        Ok(pois)
    }

    /// Build one POI from a non-blank row.
    ///
    /// # Errors
    ///
    /// Returns [`RowValidationError::MissingName`] if the name cell is blank.
    pub fn normalize_row(
        &self,
        area: &AreaConfig,
        map: &ColumnMap,
        resolver: &CoordinateResolver,
        row: &RawRow,
        row_number: usize,
        sink: &dyn EventSink,
    ) -> Result<Poi, RowValidationError> {
        let name = map.get(row, Field::Name);
        if name.is_empty() {
            return Err(RowValidationError::MissingName {
                area: area.id.clone(),
                row: row_number,
            });
        }

        let coordinates = resolver.resolve(
            map,
            row,
            RowRef {
                area: &area.id,
                row: row_number,
                poi: name,
            },
            sink,
        );

        let flags = CategoryFlags {
            japanese: is_truthy(map.get(row, Field::Japanese)),
            western: is_truthy(map.get(row, Field::Western)),
            other: is_truthy(map.get(row, Field::Other)),
            retail: is_truthy(map.get(row, Field::Retail)),
        };
        let genre = map.get(row, Field::Genre).to_owned();
        let category = classify(flags, &genre);

        let kind = PoiKind::parse(map.get(row, Field::Kind)).unwrap_or(area.kind);
        let address = map.get(row, Field::Address).to_owned();
        let search_text = search_text(name, &genre, &address, &category);

        Ok(Poi {
            id: self.poi_id(area, map, row, row_number, name),
            name: name.to_owned(),
            coordinates,
            area: area.id.clone(),
            category,
            kind,
            genre,
            business_hours: business_hours(map, row),
            address,
            phone: map.get(row, Field::Phone).to_owned(),
            payment: map.get(row, Field::Payment).to_owned(),
            parking: map.get(row, Field::ParkingInfo).to_owned(),
            flags: PoiFlags {
                is_closed: is_truthy(map.get(row, Field::Closed)),
                has_parking: is_truthy(map.get(row, Field::Parking)),
                has_cashless: is_truthy(map.get(row, Field::Cashless)),
            },
            search_text,
        })
    }

    fn poi_id(
        &self,
        area: &AreaConfig,
        map: &ColumnMap,
        row: &RawRow,
        row_number: usize,
        name: &str,
    ) -> String {
        let explicit = map.get(row, Field::Id);
        if !explicit.is_empty() {
            return explicit.to_owned();
        }
        match area.ids {
            IdStrategy::Positional => format!("{}-{row_number}", area.id),
            IdStrategy::NameCounter => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                format!("{name}-{n}")
            }
        }
    }
}

/// Columns a row cannot be placed without.
fn required_fields(source: CoordinateSource) -> &'static [Field] {
    match source {
        CoordinateSource::Wkt => &[Field::Name, Field::Wkt],
        CoordinateSource::Columns => &[Field::Name, Field::Latitude, Field::Longitude],
    }
}

fn business_hours(map: &ColumnMap, row: &RawRow) -> BusinessHours {
    BusinessHours {
        monday: map.get_opt(row, Field::Monday),
        tuesday: map.get_opt(row, Field::Tuesday),
        wednesday: map.get_opt(row, Field::Wednesday),
        thursday: map.get_opt(row, Field::Thursday),
        friday: map.get_opt(row, Field::Friday),
        saturday: map.get_opt(row, Field::Saturday),
        sunday: map.get_opt(row, Field::Sunday),
        holiday: map.get_opt(row, Field::Holiday),
    }
}

/// Lowercase, single-spaced text used for client-side search.
fn search_text(name: &str, genre: &str, address: &str, category: &[Category]) -> String {
    let labels = category.iter().map(|c| c.as_str());
    [name, genre, address]
        .into_iter()
        .chain(labels)
        .flat_map(str::split_whitespace)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn header_for(layout: &ColumnLayout, field: Field) -> String {
    match layout {
        ColumnLayout::Headers { fields } => fields
            .get(&field)
            .cloned()
            .unwrap_or_else(|| field.default_header().to_owned()),
        ColumnLayout::Fixed { .. } => field.default_header().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sadomap_core::AreaId;

    use super::*;
    use crate::events::RecordingSink;

    const CENTROID: Coordinates = Coordinates::new(38.0183, 138.3681);

    fn ryotsu() -> AreaConfig {
        AreaConfig {
            id: AreaId::new("RYOTSU_AIKAWA"),
            sheet: "両津・相川".to_string(),
            label: None,
            kind: PoiKind::Restaurant,
            columns: ColumnLayout::Fixed {
                fields: BTreeMap::from([
                    (Field::Name, 0),
                    (Field::Wkt, 1),
                    (Field::Closed, 2),
                    (Field::Genre, 3),
                ]),
            },
            coordinates: CoordinateSource::Wkt,
            ids: IdStrategy::Positional,
        }
    }

    fn sheet(rows: &[&[&str]]) -> SheetData {
        SheetData {
            headers: vec![],
            rows: rows.iter().map(|r| r.iter().copied().collect()).collect(),
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(CENTROID, None)
    }

    #[test]
    fn end_to_end_row() {
        let sink = RecordingSink::new();
        let pois = normalizer()
            .normalize_sheet(
                &ryotsu(),
                &sheet(&[&["和食店A", "POINT (138.40 38.05)", "FALSE", "寿司"]]),
                &sink,
            )
            .unwrap();

        assert_eq!(pois.len(), 1);
        let poi = &pois[0];
        assert_eq!(poi.name, "和食店A");
        assert!((poi.coordinates.lat - 38.05).abs() < 1e-12);
        assert!((poi.coordinates.lng - 138.40).abs() < 1e-12);
        assert_eq!(poi.category, vec![Category::Japanese]);
        assert_eq!(poi.area, AreaId::new("RYOTSU_AIKAWA"));
        assert!(!poi.flags.is_closed);
        assert_eq!(poi.kind, PoiKind::Restaurant);
        assert_eq!(poi.id, "RYOTSU_AIKAWA-2");
        assert_eq!(poi.search_text, "和食店a 寿司 japanese");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn missing_name_is_skipped_and_siblings_kept() {
        let sink = RecordingSink::new();
        let pois = normalizer()
            .normalize_sheet(
                &ryotsu(),
                &sheet(&[
                    &["店A", "POINT (138.40 38.05)"],
                    &["", "POINT (138.41 38.06)"],
                    &["店C", "POINT (138.42 38.07)"],
                ]),
                &sink,
            )
            .unwrap();

        let names: Vec<_> = pois.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["店A", "店C"]);
        assert_eq!(pois[1].id, "RYOTSU_AIKAWA-4");
        assert_eq!(
            sink.events(),
            vec![IngestEvent::RowRejected {
                area: AreaId::new("RYOTSU_AIKAWA"),
                row: 3,
                reason: "row 3 of area RYOTSU_AIKAWA has no name".to_string(),
            }]
        );
    }

    #[test]
    fn blank_rows_are_skipped_silently() {
        let sink = RecordingSink::new();
        let pois = normalizer()
            .normalize_sheet(&ryotsu(), &sheet(&[&["", " "], &["店A", "POINT (138.4 38.0)"]]), &sink)
            .unwrap();
        assert_eq!(pois.len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn invalid_coordinates_use_default() {
        let sink = RecordingSink::new();
        let pois = normalizer()
            .normalize_sheet(&ryotsu(), &sheet(&[&["店A", "not wkt"]]), &sink)
            .unwrap();
        assert_eq!(pois[0].coordinates, CENTROID);
        assert!(matches!(sink.events()[0], IngestEvent::CoordinateFallback { .. }));
    }

    #[test]
    fn positional_ids_are_stable_across_runs() {
        let data = sheet(&[&["店A", "POINT (138.4 38.0)"], &["店B", "POINT (138.4 38.0)"]]);
        let sink = RecordingSink::new();
        let n = normalizer();
        let first = n.normalize_sheet(&ryotsu(), &data, &sink).unwrap();
        let second = n.normalize_sheet(&ryotsu(), &data, &sink).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn name_counter_ids_increase_across_areas() {
        let mut area = ryotsu();
        area.ids = IdStrategy::NameCounter;
        let data = sheet(&[&["店A", "POINT (138.4 38.0)"]]);
        let sink = RecordingSink::new();
        let n = normalizer();
        let first = n.normalize_sheet(&area, &data, &sink).unwrap();
        let second = n.normalize_sheet(&area, &data, &sink).unwrap();
        assert_eq!(first[0].id, "店A-1");
        assert_eq!(second[0].id, "店A-2");
    }

    #[test]
    fn header_layout_reads_all_fields() {
        let area = AreaConfig {
            id: AreaId::new("PARKING"),
            sheet: "駐車場".to_string(),
            label: None,
            kind: PoiKind::Parking,
            columns: ColumnLayout::default(),
            coordinates: CoordinateSource::Columns,
            ids: IdStrategy::Positional,
        };
        let data = SheetData {
            headers: ["ID", "名称", "北緯", "東経", "種別", "月曜日", "祝日", "キャッシュレス", "所在地"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            rows: vec![[
                "P-01",
                "両津港駐車場",
                "38.08",
                "138.44",
                "トイレ",
                "9:00-17:00",
                "",
                "○",
                "佐渡市 両津湊",
            ]
            .into_iter()
            .collect()],
        };
        let sink = RecordingSink::new();
        let pois = normalizer().normalize_sheet(&area, &data, &sink).unwrap();
        let poi = &pois[0];
        assert_eq!(poi.id, "P-01");
        assert_eq!(poi.kind, PoiKind::Toilet);
        assert_eq!(poi.coordinates, Coordinates::new(38.08, 138.44));
        assert_eq!(poi.business_hours.monday.as_deref(), Some("9:00-17:00"));
        assert_eq!(poi.business_hours.holiday, None);
        assert!(poi.flags.has_cashless);
        assert_eq!(poi.address, "佐渡市 両津湊");
        assert_eq!(poi.search_text, "両津港駐車場 佐渡市 両津湊 unspecified");
        assert!(sink.events().is_empty(), "absent optional columns are not warned");
    }

    #[test]
    fn missing_coordinate_header_is_reported_once() {
        let area = AreaConfig {
            id: AreaId::new("SNACK"),
            sheet: "スナック".to_string(),
            columns: ColumnLayout::default(),
            ..ryotsu()
        };
        let data = SheetData {
            headers: vec!["名称".to_string(), "ジャンル".to_string()],
            rows: vec![["スナックA", "スナック"].into_iter().collect()],
        };
        let sink = RecordingSink::new();
        let pois = normalizer().normalize_sheet(&area, &data, &sink).unwrap();
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].coordinates, CENTROID);
        let events = sink.events();
        assert_eq!(
            events[0],
            IngestEvent::UnresolvedColumns {
                area: AreaId::new("SNACK"),
                fields: vec![Field::Wkt],
            }
        );
        assert!(matches!(events[1], IngestEvent::CoordinateFallback { .. }));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn empty_range_yields_no_pois() {
        let area = AreaConfig {
            id: AreaId::new("SNACK"),
            sheet: "スナック".to_string(),
            columns: ColumnLayout::default(),
            ..ryotsu()
        };
        let sink = RecordingSink::new();
        let pois = normalizer()
            .normalize_sheet(&area, &SheetData::default(), &sink)
            .unwrap();
        assert!(pois.is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn header_layout_without_name_fails_area() {
        let area = AreaConfig {
            columns: ColumnLayout::default(),
            ..ryotsu()
        };
        let data = SheetData {
            headers: vec!["WKT".to_string()],
            rows: vec![],
        };
        let err = normalizer()
            .normalize_sheet(&area, &data, &RecordingSink::new())
            .unwrap_err();
        assert!(
            matches!(err, IngestError::MissingColumn { ref header, .. } if header == "名称"),
            "got: {err:?}"
        );
    }
}
