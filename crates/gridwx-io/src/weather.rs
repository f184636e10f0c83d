//! Reader for yearly INMET archives: one ZIP holding one CSV per station.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use gridwx_core::{GridWxError, GridWxResult, Region, WeatherLayout, WeatherObservation};

use crate::numeric::parse_reading;
use crate::station_file::StationFileName;

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%d/%m/%Y"];

/// Counts from one pass over a weather archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherReadReport {
    pub files_seen: usize,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Parsed files whose state does not resolve to a region
    pub unknown_state_files: usize,
}

/// Read every station file in a yearly archive.
///
/// A file with a bad name or an unusable header is skipped and counted. The
/// call fails only when the archive cannot be opened or no station file at all
/// could be parsed.
pub fn read_weather_archive(
    path: &Path,
    year: i32,
    layout: &WeatherLayout,
) -> GridWxResult<(Vec<WeatherObservation>, WeatherReadReport)> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|err| {
        GridWxError::Parse(format!("reading zip archive {}: {err}", path.display()))
    })?;

    let mut observations = Vec::new();
    let mut report = WeatherReadReport::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| {
            GridWxError::Parse(format!("reading entry {i} of {}: {err}", path.display()))
        })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        report.files_seen += 1;

        let station = match StationFileName::parse(&name) {
            Ok(station) => station,
            Err(err) => {
                let err = GridWxError::from(err);
                warn!(entry = %name, error = %err, "skipping station file");
                report.files_failed += 1;
                continue;
            }
        };

        let mut bytes = Vec::new();
        if let Err(err) = entry.read_to_end(&mut bytes) {
            warn!(entry = %name, "skipping unreadable station file: {err}");
            report.files_failed += 1;
            continue;
        }

        match read_station_csv(&station, &bytes, layout) {
            Ok((rows, skipped)) => {
                debug!(
                    entry = %name,
                    station = %station.station_id,
                    rows = rows.len(),
                    skipped,
                    "parsed station file"
                );
                report.files_parsed += 1;
                report.rows_read += rows.len();
                report.rows_skipped += skipped;
                if station.region() == Region::Unknown {
                    report.unknown_state_files += 1;
                }
                observations.extend(rows);
            }
            Err(err) => {
                warn!(entry = %name, "skipping station file: {err}");
                report.files_failed += 1;
            }
        }
    }

    if report.files_parsed == 0 {
        return Err(GridWxError::NoStationData {
            year,
            archive: path.to_path_buf(),
        });
    }

    if report.unknown_state_files > 0 {
        warn!(
            year,
            files = report.unknown_state_files,
            "station files with an unmapped state were kept in the Unknown bucket"
        );
    }
    info!(
        year,
        files = report.files_parsed,
        failed = report.files_failed,
        rows = report.rows_read,
        "read weather archive"
    );
    Ok((observations, report))
}

/// Parse one station file body. Returns the observations and the number of
/// rows skipped for an unparseable date.
pub fn read_station_csv(
    station: &StationFileName,
    bytes: &[u8],
    layout: &WeatherLayout,
) -> GridWxResult<(Vec<WeatherObservation>, usize)> {
    let text = decode_text(bytes);
    let body: String = text
        .lines()
        .skip(layout.preamble_lines)
        .collect::<Vec<_>>()
        .join("\n");

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|err| schema_error(station, format!("unreadable header row: {err}")))?;
    let columns = StationColumns::locate(headers).map_err(|msg| schema_error(station, msg))?;

    let region = station.region();
    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let Some(timestamp) = columns.timestamp(&record) else {
            skipped += 1;
            continue;
        };
        let value = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .and_then(|raw| parse_reading(raw, layout.missing_sentinel))
        };
        rows.push(WeatherObservation {
            timestamp,
            station_id: station.station_id.clone(),
            state_code: station.state_code.clone(),
            region,
            temperature_c: value(Some(columns.temperature)),
            radiation_kj_m2: value(columns.radiation),
            // a negative rain gauge reading is unusable, not zero
            precipitation_mm: value(columns.precipitation).filter(|mm| *mm >= 0.0),
        });
    }
    Ok((rows, skipped))
}

fn schema_error(station: &StationFileName, message: String) -> GridWxError {
    GridWxError::Schema {
        input: format!("station {}", station.station_id),
        message,
    }
}

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to the same code point).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

struct StationColumns {
    date: usize,
    hour: Option<usize>,
    temperature: usize,
    radiation: Option<usize>,
    precipitation: Option<usize>,
}

impl StationColumns {
    fn locate(headers: &StringRecord) -> Result<Self, String> {
        let upper: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_uppercase())
            .collect();
        let starts = |prefix: &str| upper.iter().position(|h| h.starts_with(prefix));
        let contains = |needle: &str| upper.iter().position(|h| h.contains(needle));

        let date = starts("DATA").ok_or("date column not found")?;
        let temperature = contains("TEMPERATURA DO AR - BULBO SECO")
            .ok_or("dry-bulb temperature column not found")?;
        Ok(Self {
            date,
            hour: starts("HORA"),
            temperature,
            radiation: contains("RADIACAO GLOBAL"),
            precipitation: contains("PRECIPITA"),
        })
    }

    fn timestamp(&self, record: &StringRecord) -> Option<NaiveDateTime> {
        let date = record.get(self.date).and_then(parse_date)?;
        let time = self
            .hour
            .and_then(|i| record.get(i))
            .and_then(parse_hour)
            .or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
        Some(date.and_time(time))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// `"1300 UTC"` or `"13:00"`.
fn parse_hour(raw: &str) -> Option<NaiveTime> {
    let text = raw.trim();
    let text = text
        .strip_suffix("UTC")
        .map(str::trim)
        .unwrap_or(text);
    if text.contains(':') {
        NaiveTime::parse_from_str(text, "%H:%M").ok()
    } else {
        NaiveTime::parse_from_str(text, "%H%M").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const PREAMBLE: &str = "REGIAO:;SE\nUF:;MG\nESTACAO:;BELO HORIZONTE\nCODIGO (WMO):;A001\n\
LATITUDE:;-19,88\nLONGITUDE:;-43,97\nALTITUDE:;869\nDATA DE FUNDACAO:;2000-01-01\n";
    const HEADER: &str = "Data;Hora UTC;PRECIPITAÇÃO TOTAL, HORÁRIO (mm);RADIACAO GLOBAL (Kj/m²);\
TEMPERATURA DO AR - BULBO SECO, HORARIA (°C);UMIDADE RELATIVA DO AR, HORARIA (%);\n";

    fn station_body(rows: &[&str]) -> String {
        let mut body = String::from(PREAMBLE);
        body.push_str(HEADER);
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        body
    }

    fn write_archive(path: &Path, entries: &[(&str, Vec<u8>)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, bytes) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    fn station(name: &str) -> StationFileName {
        StationFileName::parse(name).unwrap()
    }

    #[test]
    fn parses_station_rows_with_sentinels() {
        let body = station_body(&[
            "2024/01/01;0000 UTC;0;-9999;21,4;80;",
            "2024/01/01;1300 UTC;1,2;1850,5;28,9;55;",
            "bad-date;1400 UTC;0;10;20;50;",
        ]);
        let meta = station("INMET_SE_MG_A001_BELO_HORIZONTE_01-01-2024_A_31-12-2024.CSV");
        let (rows, skipped) =
            read_station_csv(&meta, body.as_bytes(), &WeatherLayout::default()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(rows[0].radiation_kj_m2, None);
        assert_eq!(rows[0].temperature_c, Some(21.4));
        assert_eq!(rows[1].timestamp.hour(), 13);
        assert_eq!(rows[1].radiation_kj_m2, Some(1850.5));
        assert_eq!(rows[1].precipitation_mm, Some(1.2));
        assert_eq!(rows[1].region, Region::SoutheastMidwest);
        assert_eq!(rows[1].station_id, "A001");
    }

    #[test]
    fn negative_precipitation_is_left_out() {
        let body = station_body(&[
            "2024/01/01;0000 UTC;-3,5;100;21,0;80;",
            "2024/01/01;0100 UTC;-0,2;100;21,0;80;",
            "2024/01/01;0200 UTC;0,0;100;21,0;80;",
            "2024/01/01;0300 UTC;0,2;100;21,0;80;",
        ]);
        let meta = station("INMET_S_RS_A801_PORTO_ALEGRE.CSV");
        let (rows, skipped) =
            read_station_csv(&meta, body.as_bytes(), &WeatherLayout::default()).unwrap();

        assert_eq!(skipped, 0);
        let precipitation: Vec<Option<f64>> = rows.iter().map(|r| r.precipitation_mm).collect();
        assert_eq!(precipitation, vec![None, None, Some(0.0), Some(0.2)]);
        assert!(rows.iter().all(|r| r.temperature_c == Some(21.0)));
    }

    #[test]
    fn decodes_latin1_bodies() {
        let mut bytes: Vec<u8> = Vec::new();
        for line in PREAMBLE.lines() {
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        // "PRECIPITA\xc7\xc3O" is Latin-1 for PRECIPITAÇÃO
        bytes.extend_from_slice(b"Data;Hora UTC;PRECIPITA\xc7\xc3O TOTAL (mm);TEMPERATURA DO AR - BULBO SECO (\xb0C)\n");
        bytes.extend_from_slice(b"2024-02-01;12:00;0,4;30,1\n");

        let meta = station("INMET_NE_BA_A401_SALVADOR.CSV");
        let (rows, _) = read_station_csv(&meta, &bytes, &WeatherLayout::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].precipitation_mm, Some(0.4));
        assert_eq!(rows[0].temperature_c, Some(30.1));
        assert_eq!(rows[0].radiation_kj_m2, None);
        assert_eq!(rows[0].timestamp.hour(), 12);
    }

    #[test]
    fn missing_temperature_column_is_schema_error() {
        let mut body = String::from(PREAMBLE);
        body.push_str("Data;Hora UTC;RADIACAO GLOBAL (Kj/m²)\n2024/01/01;0000 UTC;10\n");
        let meta = station("INMET_S_PR_A807_CURITIBA.CSV");
        let err = read_station_csv(&meta, body.as_bytes(), &WeatherLayout::default()).unwrap_err();
        assert!(matches!(err, GridWxError::Schema { .. }));
    }

    #[test]
    fn archive_skips_bad_files_and_counts_unknown_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("INMET_2024.zip");
        let good = station_body(&["2024/01/01;0000 UTC;0;100;22,0;80;"]);
        write_archive(
            &path,
            &[
                ("2024/INMET_SE_MG_A001_BH.CSV", good.clone().into_bytes()),
                ("2024/INMET_SE_Z9_A002_NOWHERE.CSV", good.clone().into_bytes()),
                ("2024/BROKEN.CSV", good.clone().into_bytes()),
                ("2024/INMET_S_RS_A801_POA.CSV", b"only one line".to_vec()),
                ("2024/readme.txt", b"ignored".to_vec()),
            ],
        );

        let (rows, report) =
            read_weather_archive(&path, 2024, &WeatherLayout::default()).unwrap();
        assert_eq!(report.files_seen, 4);
        assert_eq!(report.files_parsed, 2);
        assert_eq!(report.files_failed, 2);
        assert_eq!(report.unknown_state_files, 1);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.region == Region::Unknown && r.state_code == "UNKNOWN"));
    }

    #[test]
    fn archive_without_station_data_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("INMET_2019.zip");
        write_archive(&path, &[("BROKEN.CSV", b"x".to_vec())]);

        let err = read_weather_archive(&path, 2019, &WeatherLayout::default()).unwrap_err();
        match err {
            GridWxError::NoStationData { year, archive } => {
                assert_eq!(year, 2019);
                assert_eq!(archive, path);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hour_formats() {
        assert_eq!(parse_hour("0900 UTC").map(|t| t.hour()), Some(9));
        assert_eq!(parse_hour("21:00").map(|t| t.hour()), Some(21));
        assert_eq!(parse_hour("x"), None);
    }
}
