pub mod app_config;
pub mod areas;
pub mod config;
pub mod error;
pub mod poi;

pub use app_config::{AppConfig, Environment};
pub use areas::{
    load_areas, AreaCatalog, AreaConfig, ColumnLayout, CoordinateSource, Field, IdStrategy,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use poi::{AreaId, BoundingBox, BusinessHours, Category, Coordinates, Poi, PoiFlags, PoiKind};
