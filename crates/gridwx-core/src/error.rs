//! Unified error types for the gridwx pipeline
//!
//! Every library stage returns [`GridWxResult`]. Parse-level problems (a bad
//! row, an unreadable station file) are recovered where they happen and only
//! counted; the variants here are the ones that stop a stage.
//!
//! # Example
//!
//! ```ignore
//! use gridwx_core::{GridWxError, GridWxResult};
//!
//! fn run(year: i32) -> GridWxResult<()> {
//!     let load = read_load(year)?;
//!     let weather = read_weather(year)?;
//!     merge(load, weather)?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Which raw feed a fetch error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Load,
    Weather,
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feed::Load => write!(f, "load"),
            Feed::Weather => write!(f, "weather"),
        }
    }
}

/// Failure to split a station file name into its positional fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StationFileError {
    #[error("station file name `{name}` has {found} fields, expected at least {expected}")]
    TooFewFields {
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("station file name `{name}` has an empty station code")]
    EmptyStationCode { name: String },
}

/// Error type for every gridwx stage.
#[derive(Error, Debug)]
pub enum GridWxError {
    /// Network or HTTP failure after the retry budget is spent
    #[error("failed to fetch {feed} feed for {year} from {url}: {message}")]
    Fetch {
        year: i32,
        feed: Feed,
        url: String,
        message: String,
    },

    /// A required column is missing from a raw input
    #[error("schema error in {input}: {message}")]
    Schema { input: String, message: String },

    /// A station file skipped by the archive reader
    #[error("station file: {0}")]
    StationFile(#[from] StationFileError),

    /// The weather archive contained no readable station file
    #[error("no valid station data for {year} in {}", archive.display())]
    NoStationData { year: i32, archive: PathBuf },

    /// The load/weather join matched no (date, region) key
    #[error(
        "join for {year} produced no rows ({load_days} load days, {weather_days} weather days)"
    )]
    EmptyJoin {
        year: i32,
        load_days: usize,
        weather_days: usize,
    },

    /// Columnar table read/write failure
    #[error("frame error: {0}")]
    Frame(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type GridWxResult<T> = Result<T, GridWxError>;
