use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};

/// Number of model inputs.
pub const N_FEATURES: usize = 12;

/// Authoritative input order expected by every model artifact.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "hour_sin",
    "hour_cos",
    "month_sin",
    "month_cos",
    "temp_minus_dew",
    "time_slot",
    "TEMP",
    "PRES",
    "Iws",
    "is_weekend",
    "pm25_lag_24h",
    "pm25_lag_168h",
];

/// One hourly row of the historical dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub pm25: Option<f64>,       // µg/m³, absent when the sensor reported NA
    pub dew_point: f64,          // °C
    pub temperature: f64,        // °C
    pub pressure: f64,           // hPa
    pub wind_direction: String,  // cbwd label, e.g. "NW", "cv"
    pub wind_speed: f64,         // cumulated, m/s
}

/// Ordered model input. Always 12 values, all finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    pub fn new(values: [f64; N_FEATURES]) -> Result<Self> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::InvalidInput(format!(
                "feature {} is not finite ({})",
                FEATURE_NAMES[i], values[i]
            )));
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64; N_FEATURES] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.0.get(idx).copied()
    }

    /// Pairs each value with its feature name, in model order.
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Estimated PM2.5 in µg/m³.
    pub pm25: f64,
    pub features: FeatureVector,
}

/// Manually supplied inputs, for hours the dataset does not cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    pub hour: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub temperature: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub dew_point: f64,
    pub pm25_lag_24h: f64,
    pub pm25_lag_168h: f64,
}

impl Default for Conditions {
    // Typical Beijing values; lags are long-run averages for yesterday/last week.
    fn default() -> Self {
        Self {
            hour: 12,
            month: 6,
            is_weekend: false,
            temperature: 20.0,
            pressure: 1013.0,
            wind_speed: 5.0,
            dew_point: 10.0,
            pm25_lag_24h: 80.0,
            pm25_lag_168h: 75.0,
        }
    }
}

/// A request for the hour starting at `at`.
#[derive(Debug, Clone, PartialEq)]
pub struct HourQuery {
    pub at: NaiveDateTime,
    pub location: Option<String>,
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

impl HourQuery {
    /// Parses `YYYY-MM-DDTHH[:MM[:SS]]` (or a space instead of `T`).
    /// The timestamp must fall exactly on the hour.
    pub fn parse(at: &str, location: Option<String>) -> Result<Self> {
        let at = parse_hour(at)?;
        let location = location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        Ok(Self { at, location })
    }
}

pub fn parse_hour(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    // bare "YYYY-MM-DDTHH"
    let padded = format!("{s}:00");
    let ts = TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .or_else(|_| NaiveDateTime::parse_from_str(&padded, fmt))
                .ok()
        })
        .ok_or_else(|| PredictError::InvalidInput(format!("unrecognised timestamp '{raw}'")))?;

    if ts.minute() != 0 || ts.second() != 0 {
        return Err(PredictError::InvalidInput(format!(
            "timestamp '{raw}' is not on the hour"
        )));
    }
    Ok(ts)
}
