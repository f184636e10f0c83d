//! # gridwx-core
//!
//! Shared vocabulary for the grid-load / weather pipeline:
//!
//! - [`Region`] and the state/subsystem lookup tables
//! - the row types each stage hands to the next ([`records`])
//! - [`GridWxError`], the error every stage returns
//! - [`PipelineConfig`] and its [`Thresholds`]

pub mod config;
pub mod error;
pub mod records;
pub mod region;

pub use config::{FetchConfig, PipelineConfig, Thresholds, WeatherLayout};
pub use error::{Feed, GridWxError, GridWxResult, StationFileError};
pub use records::{
    FeatureRow, LoadRecord, MergedRecord, RawLoadRow, RegionalDailyWeather, Season,
    WeatherObservation, BASE_COLUMNS, DERIVED_COLUMNS, FEATURE_COLUMNS, FEATURE_SCHEMA_VERSION,
};
pub use region::{Region, UNKNOWN_STATE};
