//! Domain types for ingested points of interest.
//!
//! A [`Poi`] is built once per accepted spreadsheet row and never mutated
//! afterwards; the store hands out shared slices of them.

use serde::{Deserialize, Serialize};

/// Identifier of an area partition (one spreadsheet tab), e.g. `RYOTSU_AIKAWA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(String);

impl AreaId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AreaId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components finite and inside `[-90, 90] × [-180, 180]`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

/// Rectangular sanity window for a region. Points outside are suspicious,
/// not invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Japanese,
    Western,
    /// Both the `japanese` and `western` flags are set.
    Fusion,
    Chinese,
    Ramen,
    Cafe,
    Sweets,
    Izakaya,
    Other,
    Retail,
    Unspecified,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Japanese => "japanese",
            Category::Western => "western",
            Category::Fusion => "fusion",
            Category::Chinese => "chinese",
            Category::Ramen => "ramen",
            Category::Cafe => "cafe",
            Category::Sweets => "sweets",
            Category::Izakaya => "izakaya",
            Category::Other => "other",
            Category::Retail => "retail",
            Category::Unspecified => "unspecified",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What sort of place a POI is. Each area sheet has a default kind; a `type`
/// column can override it per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiKind {
    Restaurant,
    Parking,
    Toilet,
    Shop,
    Other,
}

impl PoiKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PoiKind::Restaurant => "restaurant",
            PoiKind::Parking => "parking",
            PoiKind::Toilet => "toilet",
            PoiKind::Shop => "shop",
            PoiKind::Other => "other",
        }
    }

    /// Parse an English or Japanese kind label. Returns `None` for anything
    /// unrecognised so the caller can fall back to the area default.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "restaurant" | "飲食店" | "レストラン" => Some(PoiKind::Restaurant),
            "parking" | "駐車場" => Some(PoiKind::Parking),
            "toilet" | "トイレ" | "公衆トイレ" => Some(PoiKind::Toilet),
            "shop" | "売店" | "お土産" | "商店" => Some(PoiKind::Shop),
            "other" | "その他" => Some(PoiKind::Other),
            _ => None,
        }
    }
}

/// Opening hours as written in the sheet, one optional free-text entry per day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thursday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiFlags {
    pub is_closed: bool,
    pub has_parking: bool,
    pub has_cashless: bool,
}

/// A validated, geolocated, categorized point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinates,
    pub area: AreaId,
    /// Never empty; the first entry is the primary category.
    pub category: Vec<Category>,
    #[serde(rename = "type")]
    pub kind: PoiKind,
    pub genre: String,
    pub business_hours: BusinessHours,
    pub address: String,
    pub phone: String,
    pub payment: String,
    pub parking: String,
    pub flags: PoiFlags,
    pub search_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_range_check() {
        assert!(Coordinates::new(38.05, 138.4).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(90.1, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn bounding_box_is_inclusive() {
        let sado = BoundingBox {
            min_lat: 37.5,
            max_lat: 38.5,
            min_lng: 138.0,
            max_lng: 138.6,
        };
        assert!(sado.contains(Coordinates::new(37.5, 138.6)));
        assert!(sado.contains(Coordinates::new(38.05, 138.4)));
        assert!(!sado.contains(Coordinates::new(35.68, 139.76)));
    }

    #[test]
    fn kind_parses_japanese_labels() {
        assert_eq!(PoiKind::parse("駐車場"), Some(PoiKind::Parking));
        assert_eq!(PoiKind::parse(" Toilet "), Some(PoiKind::Toilet));
        assert_eq!(PoiKind::parse("飲食店"), Some(PoiKind::Restaurant));
        assert_eq!(PoiKind::parse("温泉"), None);
    }

    #[test]
    fn poi_serializes_type_and_camel_case() {
        let poi = Poi {
            id: "RYOTSU_AIKAWA-1".to_string(),
            name: "和食店A".to_string(),
            coordinates: Coordinates::new(38.05, 138.4),
            area: AreaId::new("RYOTSU_AIKAWA"),
            category: vec![Category::Japanese],
            kind: PoiKind::Restaurant,
            genre: "寿司".to_string(),
            business_hours: BusinessHours::default(),
            address: String::new(),
            phone: String::new(),
            payment: String::new(),
            parking: String::new(),
            flags: PoiFlags::default(),
            search_text: "和食店a 寿司 japanese".to_string(),
        };
        let json = serde_json::to_value(&poi).unwrap();
        assert_eq!(json["type"], "restaurant");
        assert_eq!(json["area"], "RYOTSU_AIKAWA");
        assert_eq!(json["category"][0], "japanese");
        assert_eq!(json["flags"]["isClosed"], false);
        assert!(json.get("searchText").is_some());
        assert!(json["businessHours"].as_object().unwrap().is_empty());
    }
}
