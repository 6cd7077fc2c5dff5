use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Weekday};

use crate::error::{PredictError, Result};
use crate::history::History;
use crate::types::{Conditions, FeatureVector, N_FEATURES};

/// Hours back for the "yesterday" lag.
pub const LAG_DAY_HOURS: i64 = 24;
/// Hours back for the "last week" lag.
pub const LAG_WEEK_HOURS: i64 = 168;

/// Part of the day the hour falls in, encoded as the model saw it in training.
pub fn time_slot(hour: u32) -> u8 {
    match hour {
        5..=11 => 0,  // morning
        12..=16 => 1, // afternoon
        17..=20 => 2, // evening
        _ => 3,       // night
    }
}

struct Weather {
    temperature: f64,
    pressure: f64,
    wind_speed: f64,
    dew_point: f64,
}

/// Turns observations (or manually entered conditions) into the
/// 12-value model input. Holds no state; every call is pure.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds features for the hour starting at `at` from recorded history.
    ///
    /// Needs the weather observation for `at` itself plus measured PM2.5
    /// exactly 24 and 168 hours earlier.
    ///
    /// # Errors
    /// `MissingData` naming the first hour that is absent.
    pub fn build(&self, at: NaiveDateTime, history: &History) -> Result<FeatureVector> {
        let obs = history.get(&at).ok_or_else(|| {
            PredictError::MissingData(format!("no weather observation for {at}"))
        })?;

        let lag = |hours: i64| -> Result<f64> {
            let when = at - Duration::hours(hours);
            history.pm25_at(&when).ok_or_else(|| {
                PredictError::MissingData(format!(
                    "no PM2.5 measurement {hours}h before {at} ({when})"
                ))
            })
        };
        let lag_day = lag(LAG_DAY_HOURS)?;
        let lag_week = lag(LAG_WEEK_HOURS)?;

        let weekend = matches!(at.weekday(), Weekday::Sat | Weekday::Sun);
        let weather = Weather {
            temperature: obs.temperature,
            pressure: obs.pressure,
            wind_speed: obs.wind_speed,
            dew_point: obs.dew_point,
        };
        assemble(at.hour(), at.month(), weekend, &weather, lag_day, lag_week)
    }

    /// Builds features from user-entered conditions after range checks.
    pub fn from_conditions(&self, c: &Conditions) -> Result<FeatureVector> {
        check_range("hour", c.hour as f64, 0.0, 23.0)?;
        check_range("month", c.month as f64, 1.0, 12.0)?;
        check_range("temperature", c.temperature, -20.0, 45.0)?;
        check_range("pressure", c.pressure, 980.0, 1040.0)?;
        check_range("wind_speed", c.wind_speed, 0.0, 100.0)?;
        check_range("dew_point", c.dew_point, -20.0, 30.0)?;
        check_range("pm25_lag_24h", c.pm25_lag_24h, 0.0, 500.0)?;
        check_range("pm25_lag_168h", c.pm25_lag_168h, 0.0, 500.0)?;

        let weather = Weather {
            temperature: c.temperature,
            pressure: c.pressure,
            wind_speed: c.wind_speed,
            dew_point: c.dew_point,
        };
        assemble(
            c.hour,
            c.month,
            c.is_weekend,
            &weather,
            c.pm25_lag_24h,
            c.pm25_lag_168h,
        )
    }
}

fn check_range(name: &str, v: f64, lo: f64, hi: f64) -> Result<()> {
    // NaN fails the containment test too
    if (lo..=hi).contains(&v) {
        Ok(())
    } else {
        Err(PredictError::InvalidInput(format!(
            "{name} must be within [{lo}, {hi}], got {v}"
        )))
    }
}

fn assemble(
    hour: u32,
    month: u32,
    weekend: bool,
    w: &Weather,
    lag_day: f64,
    lag_week: f64,
) -> Result<FeatureVector> {
    let hour_angle = 2.0 * PI * hour as f64 / 24.0;
    let month_angle = 2.0 * PI * (month as f64 - 1.0) / 12.0;

    let values: [f64; N_FEATURES] = [
        hour_angle.sin(),
        hour_angle.cos(),
        month_angle.sin(),
        month_angle.cos(),
        w.temperature - w.dew_point,
        time_slot(hour) as f64,
        w.temperature,
        w.pressure,
        w.wind_speed,
        if weekend { 1.0 } else { 0.0 },
        lag_day,
        lag_week,
    ];
    FeatureVector::new(values)
}
