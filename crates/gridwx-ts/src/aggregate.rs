//! Hourly station observations to one row per (region, date).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use gridwx_core::{Region, RegionalDailyWeather, WeatherObservation};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub observations: usize,
    pub groups: usize,
    pub groups_without_temperature: usize,
}

pub fn aggregate_weather(
    observations: Vec<WeatherObservation>,
) -> (Vec<RegionalDailyWeather>, AggregateReport) {
    let mut report = AggregateReport {
        observations: observations.len(),
        ..AggregateReport::default()
    };

    let mut buckets: BTreeMap<(Region, NaiveDate), DailyStats> = BTreeMap::new();
    for obs in observations {
        let entry = buckets
            .entry((obs.region, obs.timestamp.date()))
            .or_default();
        if let Some(t) = obs.temperature_c {
            entry.temperature.push(t);
        }
        if let Some(r) = obs.radiation_kj_m2 {
            entry.radiation.push(r);
        }
        if let Some(p) = obs.precipitation_mm.filter(|p| *p >= 0.0) {
            entry.precipitation.push(p);
        }
    }

    report.groups = buckets.len();
    let mut daily = Vec::with_capacity(buckets.len());
    for ((region, date), stats) in buckets {
        let Some(temp) = stats.temperature.finish() else {
            report.groups_without_temperature += 1;
            continue;
        };
        daily.push(RegionalDailyWeather {
            date,
            region,
            temp_mean: temp.mean(),
            temp_min: temp.min,
            temp_max: temp.max,
            radiation_mean: stats.radiation.finish().map(|r| r.mean()),
            precipitation_total: stats.precipitation.finish().map(|p| p.sum),
        });
    }

    if report.groups_without_temperature > 0 {
        warn!(
            groups = report.groups_without_temperature,
            "dropped region-days with no valid temperature"
        );
    }
    info!(
        observations = report.observations,
        days = daily.len(),
        "aggregated weather"
    );
    (daily, report)
}

#[derive(Default)]
struct DailyStats {
    temperature: Accumulator,
    radiation: Accumulator,
    precipitation: Accumulator,
}

#[derive(Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// `None` when nothing was pushed.
    fn finish(self) -> Option<Self> {
        (self.count > 0).then_some(self)
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}
