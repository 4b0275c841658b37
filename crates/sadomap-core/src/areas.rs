//! Area catalog: which spreadsheet tab backs each area, how its columns are
//! laid out, and how coordinates and ids are derived from its rows.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::poi::{AreaId, BoundingBox, Coordinates, PoiKind};
use crate::ConfigError;

/// Semantic fields a row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Wkt,
    Latitude,
    Longitude,
    Genre,
    Japanese,
    Western,
    Other,
    Retail,
    Closed,
    Parking,
    Cashless,
    Address,
    Phone,
    Payment,
    ParkingInfo,
    Kind,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Holiday,
}

impl Field {
    pub const ALL: [Field; 26] = [
        Field::Id,
        Field::Name,
        Field::Wkt,
        Field::Latitude,
        Field::Longitude,
        Field::Genre,
        Field::Japanese,
        Field::Western,
        Field::Other,
        Field::Retail,
        Field::Closed,
        Field::Parking,
        Field::Cashless,
        Field::Address,
        Field::Phone,
        Field::Payment,
        Field::ParkingInfo,
        Field::Kind,
        Field::Monday,
        Field::Tuesday,
        Field::Wednesday,
        Field::Thursday,
        Field::Friday,
        Field::Saturday,
        Field::Sunday,
        Field::Holiday,
    ];

    /// Header text used by the published sheets when a layout does not name
    /// its own headers.
    #[must_use]
    pub fn default_header(self) -> &'static str {
        match self {
            Field::Id => "ID",
            Field::Name => "名称",
            Field::Wkt => "WKT",
            Field::Latitude => "北緯",
            Field::Longitude => "東経",
            Field::Genre => "ジャンル",
            Field::Japanese => "和食",
            Field::Western => "洋食",
            Field::Other => "その他",
            Field::Retail => "販売",
            Field::Closed => "閉店",
            Field::Parking => "駐車場",
            Field::Cashless => "キャッシュレス",
            Field::Address => "所在地",
            Field::Phone => "連絡先",
            Field::Payment => "支払い",
            Field::ParkingInfo => "駐車場情報",
            Field::Kind => "種別",
            Field::Monday => "月曜日",
            Field::Tuesday => "火曜日",
            Field::Wednesday => "水曜日",
            Field::Thursday => "木曜日",
            Field::Friday => "金曜日",
            Field::Saturday => "土曜日",
            Field::Sunday => "日曜日",
            Field::Holiday => "祝日",
        }
    }
}

fn default_header_names() -> BTreeMap<Field, String> {
    Field::ALL
        .iter()
        .map(|f| (*f, f.default_header().to_string()))
        .collect()
}

/// How cells are located within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColumnLayout {
    /// Static column positions.
    Fixed { fields: BTreeMap<Field, usize> },
    /// Header names, resolved against the sheet's first row.
    Headers {
        #[serde(default = "default_header_names")]
        fields: BTreeMap<Field, String>,
    },
}

impl ColumnLayout {
    #[must_use]
    pub fn maps(&self, field: Field) -> bool {
        match self {
            ColumnLayout::Fixed { fields } => fields.contains_key(&field),
            ColumnLayout::Headers { fields } => fields.contains_key(&field),
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::Headers {
            fields: default_header_names(),
        }
    }
}

/// Where a row's coordinates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    /// A `POINT (lng lat)` cell.
    #[default]
    Wkt,
    /// Separate latitude and longitude cells.
    Columns,
}

/// How a POI id is derived when the row has no explicit id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `{area}-{row}`; stable across re-fetches of unchanged sheets.
    #[default]
    Positional,
    /// `{name}-{n}` with a counter shared by the whole pipeline.
    NameCounter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub id: AreaId,
    /// Spreadsheet tab name (or CSV file stem).
    pub sheet: String,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: PoiKind,
    #[serde(default)]
    pub columns: ColumnLayout,
    #[serde(default)]
    pub coordinates: CoordinateSource,
    #[serde(default)]
    pub ids: IdStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaCatalog {
    /// Substituted for missing or invalid coordinates.
    pub default_coordinates: Coordinates,
    /// Soft sanity window; points outside it are logged, not replaced.
    #[serde(default)]
    pub region: Option<BoundingBox>,
    pub areas: Vec<AreaConfig>,
}

impl AreaCatalog {
    #[must_use]
    pub fn get(&self, id: &AreaId) -> Option<&AreaConfig> {
        self.areas.iter().find(|a| &a.id == id)
    }

    /// Validate cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_coordinates.is_valid() {
            return Err(ConfigError::Validation(format!(
                "default_coordinates out of range: {:?}",
                self.default_coordinates
            )));
        }

        if let Some(region) = &self.region {
            if region.min_lat > region.max_lat || region.min_lng > region.max_lng {
                return Err(ConfigError::Validation(
                    "region bounds are inverted (min greater than max)".to_string(),
                ));
            }
        }

        if self.areas.is_empty() {
            return Err(ConfigError::Validation(
                "at least one area must be configured".to_string(),
            ));
        }

        let mut seen_ids = HashSet::new();
        for area in &self.areas {
            validate_area(area)?;
            if !seen_ids.insert(area.id.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate area id: '{}'",
                    area.id
                )));
            }
        }

        Ok(())
    }
}

fn validate_area(area: &AreaConfig) -> Result<(), ConfigError> {
    if area.id.as_str().trim().is_empty() {
        return Err(ConfigError::Validation(
            "area id must be non-empty".to_string(),
        ));
    }
    if area.sheet.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "area '{}' has an empty sheet name",
            area.id
        )));
    }
    if !area.columns.maps(Field::Name) {
        return Err(ConfigError::Validation(format!(
            "area '{}' does not map the name column",
            area.id
        )));
    }

    let required: &[Field] = match area.coordinates {
        CoordinateSource::Wkt => &[Field::Wkt],
        CoordinateSource::Columns => &[Field::Latitude, Field::Longitude],
    };
    if let Some(missing) = required.iter().find(|f| !area.columns.maps(**f)) {
        return Err(ConfigError::Validation(format!(
            "area '{}' uses {:?} coordinates but does not map {missing:?}",
            area.id, area.coordinates
        )));
    }

    if let ColumnLayout::Headers { fields } = &area.columns {
        if let Some((field, _)) = fields.iter().find(|(_, h)| h.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "area '{}' maps {field:?} to an empty header",
                area.id
            )));
        }
    }

    Ok(())
}

/// Load and validate the area catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_areas(path: &Path) -> Result<AreaCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AreasFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: AreaCatalog = serde_yaml::from_str(&content)?;
    catalog.validate()?;

    Ok(catalog)
}
