//! Reader for the ONS daily/hourly load CSV (`CARGA_ENERGIA_{year}.csv`).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use gridwx_core::{GridWxError, GridWxResult, RawLoadRow, Region};

use crate::numeric::parse_decimal;

const TIMESTAMP_COLUMN: &str = "din_instante";
const SUBSYSTEM_ID_COLUMN: &str = "id_subsistema";
const SUBSYSTEM_NAME_COLUMN: &str = "nom_subsistema";
const LOAD_COLUMN: &str = "val_cargaenergiamwmed";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Counts from one pass over the load feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReadReport {
    pub rows_read: usize,
    pub rows_malformed: usize,
}

/// Parse a load-feed timestamp. Date-only values are taken as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn read_load_csv(path: &Path) -> GridWxResult<(Vec<RawLoadRow>, LoadReadReport)> {
    let file = File::open(path)?;
    read_load(file, &path.display().to_string())
}

/// Read `;`-delimited load rows from any reader.
///
/// Fails only when a required column is absent; rows the CSV layer cannot
/// decode are skipped and counted.
pub fn read_load<R: Read>(
    reader: R,
    input: &str,
) -> GridWxResult<(Vec<RawLoadRow>, LoadReadReport)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|err| GridWxError::Schema {
        input: input.to_string(),
        message: format!("unreadable header row: {err}"),
    })?;
    let columns = LoadColumns::locate(headers, input)?;

    let mut rows = Vec::new();
    let mut report = LoadReadReport::default();
    for (line, record) in rdr.records().enumerate() {
        match record {
            Ok(record) => {
                rows.push(columns.row(&record));
                report.rows_read += 1;
            }
            Err(err) => {
                report.rows_malformed += 1;
                debug!(input, line = line + 2, "skipping malformed load row: {err}");
            }
        }
    }

    if report.rows_malformed > 0 {
        warn!(
            input,
            malformed = report.rows_malformed,
            "load feed contained rows that could not be decoded"
        );
    }
    info!(input, rows = report.rows_read, "read load feed");
    Ok((rows, report))
}

struct LoadColumns {
    timestamp: usize,
    subsystem: usize,
    load: usize,
}

impl LoadColumns {
    fn locate(headers: &StringRecord, input: &str) -> GridWxResult<Self> {
        let find = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(name)
            })
        };
        let missing = |name: &str| GridWxError::Schema {
            input: input.to_string(),
            message: format!("required column `{name}` not found"),
        };

        let timestamp = find(TIMESTAMP_COLUMN).ok_or_else(|| missing(TIMESTAMP_COLUMN))?;
        let subsystem = find(SUBSYSTEM_ID_COLUMN)
            .or_else(|| find(SUBSYSTEM_NAME_COLUMN))
            .ok_or_else(|| missing(SUBSYSTEM_ID_COLUMN))?;
        let load = find(LOAD_COLUMN).ok_or_else(|| missing(LOAD_COLUMN))?;
        Ok(Self {
            timestamp,
            subsystem,
            load,
        })
    }

    fn row(&self, record: &StringRecord) -> RawLoadRow {
        let subsystem = record
            .get(self.subsystem)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        RawLoadRow {
            timestamp: record.get(self.timestamp).and_then(parse_timestamp),
            region: subsystem.as_deref().and_then(Region::from_subsystem),
            subsystem,
            load_mw: record.get(self.load).and_then(parse_decimal),
        }
    }
}
