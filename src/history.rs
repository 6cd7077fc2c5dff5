use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{PredictError, Result};
use crate::types::Observation;

/// Raw row of the Beijing PRSA hourly dataset.
/// Columns not listed here (`No`, `Is`, `Ir`) are ignored.
#[derive(Debug, Deserialize)]
struct PrsaRow {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    #[serde(rename = "pm2.5", deserialize_with = "csv::invalid_option")]
    pm25: Option<f64>,
    #[serde(rename = "DEWP")]
    dew_point: f64,
    #[serde(rename = "TEMP")]
    temperature: f64,
    #[serde(rename = "PRES")]
    pressure: f64,
    #[serde(rename = "cbwd")]
    wind_direction: String,
    #[serde(rename = "Iws")]
    wind_speed: f64,
}

/// Hourly observations indexed by timestamp.
#[derive(Debug, Default, Clone)]
pub struct History {
    by_hour: BTreeMap<NaiveDateTime, Observation>,
}

impl History {
    pub fn from_observations<I>(obs: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let by_hour = obs.into_iter().map(|o| (o.timestamp, o)).collect();
        Self { by_hour }
    }

    /// Loads a PRSA-format CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| PredictError::DataLoad(format!("{}: {e}", path.display())))?;
        let history = Self::from_reader(file)?;
        tracing::info!(
            "loaded {} hourly observations from {}",
            history.len(),
            path.display()
        );
        Ok(history)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut by_hour = BTreeMap::new();
        let mut duplicates = 0usize;

        let headers = reader
            .headers()
            .map_err(|e| PredictError::DataLoad(format!("unreadable header: {e}")))?
            .clone();

        for record in reader.records() {
            let record = record.map_err(|e| PredictError::DataLoad(e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row: PrsaRow = record
                .deserialize(Some(&headers))
                .map_err(|e| PredictError::DataLoad(format!("line {line}: {e}")))?;
            let timestamp = NaiveDate::from_ymd_opt(row.year, row.month, row.day)
                .and_then(|d| d.and_hms_opt(row.hour, 0, 0))
                .ok_or_else(|| {
                    PredictError::DataLoad(format!(
                        "line {line}: invalid date {}-{}-{} hour {}",
                        row.year, row.month, row.day, row.hour
                    ))
                })?;
            let obs = Observation {
                timestamp,
                pm25: row.pm25.filter(|v| v.is_finite()),
                dew_point: row.dew_point,
                temperature: row.temperature,
                pressure: row.pressure,
                wind_direction: row.wind_direction,
                wind_speed: row.wind_speed,
            };
            if by_hour.insert(timestamp, obs).is_some() {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            tracing::warn!("{duplicates} duplicate hourly rows; kept the last of each");
        }
        Ok(Self { by_hour })
    }

    pub fn get(&self, at: &NaiveDateTime) -> Option<&Observation> {
        self.by_hour.get(at)
    }

    /// Measured PM2.5 at `at`, if the hour exists and was not `NA`.
    pub fn pm25_at(&self, at: &NaiveDateTime) -> Option<f64> {
        self.get(at).and_then(|o| o.pm25)
    }

    /// First and last recorded hours.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.by_hour.keys().next()?;
        let last = self.by_hour.keys().next_back()?;
        Some((*first, *last))
    }

    pub fn len(&self) -> usize {
        self.by_hour.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hour.is_empty()
    }
}
