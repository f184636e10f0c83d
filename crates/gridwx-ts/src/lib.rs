//! # gridwx-ts
//!
//! The daily load/weather pipeline, stage by stage:
//!
//! 1. [`clean`]: validate hourly load, drop duplicates and global outliers
//! 2. [`aggregate`]: collapse station observations to region-days
//! 3. [`merge`]: inner-join daily load with complete daily weather
//! 4. [`features`]: per-region calendar, rolling, lag and anomaly columns
//!
//! [`pipeline`] chains the stages for one year and [`frame`] persists the
//! result as Parquet or CSV. [`summary`] and [`synth`] work on finished tables.

pub mod aggregate;
pub mod baseline;
pub mod clean;
pub mod features;
pub mod frame;
pub mod merge;
pub mod pipeline;
pub mod summary;
pub mod synth;

pub use aggregate::{aggregate_weather, AggregateReport};
pub use clean::{clean_load, CleanReport};
pub use features::compute_features;
pub use frame::{read_features, read_merged, write_features};
pub use merge::{merge, MergeReport};
pub use pipeline::{
    build_features, refeature, run_year, PipelineInputs, PipelineReport, RefeatureReport,
};
pub use summary::{summarize, RegionSummary, TableSummary};
pub use synth::{synthesize_features, synthesize_year};
