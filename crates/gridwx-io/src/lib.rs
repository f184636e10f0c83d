//! # gridwx-io
//!
//! Raw feed access for the pipeline: the ONS load CSV, the INMET per-station
//! weather archive, decimal-comma parsing shared by both, and the
//! download cache that keeps a local copy of each yearly file.

pub mod load;
pub mod numeric;
pub mod sources;
pub mod station_file;
pub mod weather;

pub use load::{parse_timestamp, read_load, read_load_csv, LoadReadReport};
pub use numeric::{parse_decimal, parse_reading};
pub use sources::FeedCache;
pub use station_file::StationFileName;
pub use weather::{read_station_csv, read_weather_archive, WeatherReadReport};
