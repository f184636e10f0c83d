//! Positional parser for INMET station file names.
//!
//! Names follow `PREFIX_MACROREGION_STATE_STATIONCODE_NAME..._START_A_END.CSV`,
//! for example `INMET_SE_MG_A001_BELO_HORIZONTE_01-01-2024_A_31-12-2024.CSV`.

use chrono::NaiveDate;

use gridwx_core::{Region, StationFileError, UNKNOWN_STATE};

const MIN_FIELDS: usize = 4;
const PERIOD_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationFileName {
    pub prefix: String,
    pub macro_region: String,
    /// Two-letter state code, or `UNKNOWN`
    pub state_code: String,
    pub station_id: String,
    pub station_name: String,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

impl StationFileName {
    /// Parse an archive entry name. Directory prefixes and the extension are ignored.
    pub fn parse(entry_name: &str) -> Result<Self, StationFileError> {
        let base = entry_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(entry_name);
        let stem = match base.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => base,
        };

        let fields: Vec<&str> = stem.split('_').collect();
        if fields.len() < MIN_FIELDS {
            return Err(StationFileError::TooFewFields {
                name: base.to_string(),
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }

        let station_id = fields[3].trim();
        if station_id.is_empty() {
            return Err(StationFileError::EmptyStationCode {
                name: base.to_string(),
            });
        }

        let state = fields[2].trim();
        let state_code = if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
            state.to_ascii_uppercase()
        } else {
            UNKNOWN_STATE.to_string()
        };

        let (name_fields, period) = split_period(&fields[4..]);

        Ok(Self {
            prefix: fields[0].to_string(),
            macro_region: fields[1].to_string(),
            state_code,
            station_id: station_id.to_string(),
            station_name: name_fields.join(" "),
            period,
        })
    }

    pub fn region(&self) -> Region {
        Region::from_state(&self.state_code)
    }

    pub fn has_unknown_state(&self) -> bool {
        self.state_code == UNKNOWN_STATE
    }
}

/// Peel a trailing `START_A_END` coverage period off the name fields.
fn split_period<'a>(fields: &'a [&'a str]) -> (&'a [&'a str], Option<(NaiveDate, NaiveDate)>) {
    if let [name @ .., start, sep, end] = fields {
        if sep.eq_ignore_ascii_case("A") {
            if let (Ok(start), Ok(end)) = (
                NaiveDate::parse_from_str(start, PERIOD_FORMAT),
                NaiveDate::parse_from_str(end, PERIOD_FORMAT),
            ) {
                return (name, Some((start, end)));
            }
        }
    }
    (fields, None)
}
