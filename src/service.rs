use std::{fmt::Write as _, sync::Arc};

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::advisory::{self, Advisory};
use crate::config::AppConfig;
use crate::error::{PredictError, Result};
use crate::features::FeatureBuilder;
use crate::history::History;
use crate::model::{Model, ModelMetrics};
use crate::predictor::Predictor;
use crate::types::{Conditions, FeatureVector, HourQuery, Prediction};

/// Everything shown to the user for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Requested hour; absent for manual estimates.
    pub at: Option<NaiveDateTime>,
    pub hour: u32,
    pub location: String,
    pub prediction: Prediction,
    pub advisory: Advisory,
    pub timing_tip: &'static str,
    pub metrics: Option<ModelMetrics>,
}

/// Feature builder, predictor and advisory wired together.
pub struct PredictionService {
    builder: FeatureBuilder,
    predictor: Predictor,
    history: Option<History>,
    station: String,
    log_features: bool,
}

impl PredictionService {
    pub fn new(predictor: Predictor, history: Option<History>, station: impl Into<String>) -> Self {
        Self {
            builder: FeatureBuilder::new(),
            predictor,
            history,
            station: station.into(),
            log_features: false,
        }
    }

    pub fn with_feature_logging(mut self, on: bool) -> Self {
        self.log_features = on;
        self
    }

    /// Loads the model (and dataset, if configured) and runs a warm-up.
    ///
    /// # Errors
    /// `ModelLoad` or `DataLoad`; both are fatal at startup.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let model = Model::load(&cfg.model_path, &cfg.meta_path)?;
        let predictor = Predictor::new(Arc::new(model));
        predictor.warmup()?;

        let history = match &cfg.data_path {
            Some(path) => Some(History::load(path)?),
            None => {
                tracing::warn!("DATA_PATH not set; only manual estimates are available");
                None
            }
        };
        Ok(Self::new(predictor, history, cfg.station.clone()).with_feature_logging(cfg.log_features))
    }

    pub fn model(&self) -> &Model {
        self.predictor.model()
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    /// Named features for a recorded hour, without running the model.
    pub fn features_at(&self, query: &HourQuery) -> Result<FeatureVector> {
        self.check_location(query.location.as_deref())?;
        let history = self.history.as_ref().ok_or_else(|| {
            PredictError::MissingData("no historical dataset loaded".into())
        })?;
        self.builder.build(query.at, history)
    }

    /// Predicts the hour in `query` from recorded history.
    pub fn predict_at(&self, query: &HourQuery) -> Result<Report> {
        let features = self.features_at(query)?;
        Ok(self.report(Some(query.at), query.at.hour(), features))
    }

    /// Predicts from manually entered conditions.
    pub fn estimate(&self, conditions: &Conditions) -> Result<Report> {
        let features = self.builder.from_conditions(conditions)?;
        Ok(self.report(None, conditions.hour, features))
    }

    fn report(&self, at: Option<NaiveDateTime>, hour: u32, features: FeatureVector) -> Report {
        if self.log_features {
            log_summary(hour, &features);
        }
        let prediction = self.predictor.predict(features);
        let advisory = advisory::advise(prediction.pm25);
        tracing::debug!(
            "hour={} pm25={:.1} level={}",
            hour,
            prediction.pm25,
            advisory.level
        );
        Report {
            at,
            hour,
            location: self.station.clone(),
            prediction,
            advisory,
            timing_tip: advisory::outdoor_timing_tip(hour),
            metrics: self.predictor.model().meta().metrics,
        }
    }

    fn check_location(&self, location: Option<&str>) -> Result<()> {
        match location {
            Some(loc) if !loc.eq_ignore_ascii_case(&self.station) => {
                Err(PredictError::InvalidInput(format!(
                    "unknown location '{loc}'; this model covers {}",
                    self.station
                )))
            }
            _ => Ok(()),
        }
    }
}

fn log_summary(hour: u32, features: &FeatureVector) {
    let v = features.values();
    let n = v.len() as f64;
    let nz = v.iter().filter(|x| **x != 0.0).count();
    let mean = v.iter().sum::<f64>() / n;
    let std = (v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt();
    let sample: Vec<String> = features
        .named()
        .iter()
        .take(6)
        .map(|(name, x)| format!("{name}={x:.3}"))
        .collect();
    tracing::info!(
        "features hour={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
        hour,
        nz,
        mean,
        std,
        sample.join(", ")
    );
}

/// Plain-text rendering of a report.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let when = match report.at {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("{:02}:00", report.hour),
    };
    let _ = writeln!(
        out,
        "Predicted PM2.5 at {} ({}): {:.1} µg/m³",
        when, report.location, report.prediction.pm25
    );
    let _ = writeln!(
        out,
        "Advisory: {}. {}",
        report.advisory.level, report.advisory.recommendation
    );
    let _ = writeln!(
        out,
        "Air quality: {}. {}",
        report.advisory.category, report.advisory.health_advice
    );
    let _ = writeln!(out, "Timing: {}", report.timing_tip);
    if let Some(m) = report.metrics {
        let _ = writeln!(
            out,
            "Model: average error ±{:.1} µg/m³, R² {:.3}",
            m.mae, m.r2
        );
    }
    out
}

/// Named feature table, one `name = value` per line.
pub fn render_features(features: &FeatureVector) -> String {
    features
        .named()
        .iter()
        .map(|(name, v)| format!("{name:>14} = {v:.4}\n"))
        .collect()
}

/// Renders either outcome; failures become a readable message instead of
/// propagating.
pub fn respond(outcome: Result<Report>) -> String {
    match outcome {
        Ok(report) => render(&report),
        Err(e) => {
            tracing::warn!("request failed: {}", e);
            format!("error: {e}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::AdvisoryLevel;
    use crate::model::tests::{forest_json, meta_json};
    use crate::types::Observation;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn history(pm25: f64) -> History {
        History::from_observations((0..200).map(|i| Observation {
            timestamp: start() + Duration::hours(i),
            pm25: Some(pm25),
            dew_point: -10.0,
            temperature: -2.0,
            pressure: 1030.0,
            wind_direction: "NW".into(),
            wind_speed: 3.0,
        }))
    }

    fn service(history: Option<History>) -> PredictionService {
        let model = Model::from_json(&forest_json(), &meta_json()).unwrap();
        PredictionService::new(Predictor::new(Arc::new(model)), history, "Beijing")
    }

    fn query(offset: i64, location: Option<&str>) -> HourQuery {
        HourQuery {
            at: start() + Duration::hours(offset),
            location: location.map(String::from),
        }
    }

    #[test]
    fn predicts_from_history() {
        let svc = service(Some(history(150.0)));
        let report = svc.predict_at(&query(180, None)).unwrap();
        // lag 150 > 100 -> 200, wind 3 <= 10 -> 120
        assert_eq!(report.prediction.pm25, 160.0);
        assert_eq!(report.advisory.level, AdvisoryLevel::Unsafe);
        assert_eq!(report.hour, 12);
        assert_eq!(report.location, "Beijing");
        assert_eq!(report.metrics.map(|m| m.mae), Some(45.6));
    }

    #[test]
    fn location_is_case_insensitive_and_checked() {
        let svc = service(Some(history(50.0)));
        assert!(svc.predict_at(&query(180, Some("beijing"))).is_ok());
        assert!(matches!(
            svc.predict_at(&query(180, Some("Shanghai"))),
            Err(PredictError::InvalidInput(_))
        ));
    }

    #[test]
    fn no_history_means_missing_data() {
        let svc = service(None);
        assert!(matches!(
            svc.predict_at(&query(180, None)),
            Err(PredictError::MissingData(_))
        ));
        let svc = service(Some(history(50.0)));
        assert!(matches!(
            svc.predict_at(&query(10, None)),
            Err(PredictError::MissingData(_))
        ));
    }

    #[test]
    fn estimates_from_conditions() {
        let svc = service(None).with_feature_logging(true);
        let report = svc.estimate(&Conditions::default()).unwrap();
        // lag 80 -> 40, wind 5 -> 120
        assert_eq!(report.prediction.pm25, 80.0);
        assert_eq!(report.advisory.level, AdvisoryLevel::Caution);
        assert_eq!(report.at, None);
        assert_eq!(report.hour, 12);
    }

    #[test]
    fn render_and_respond() {
        let svc = service(None);
        let text = respond(svc.estimate(&Conditions::default()));
        assert!(text.contains("Predicted PM2.5 at 12:00 (Beijing): 80.0 µg/m³"));
        assert!(text.contains("Advisory: caution."));
        assert!(text.contains("Air quality: Unhealthy."));
        assert!(text.contains("±45.6"));

        let text = respond(svc.predict_at(&query(180, None)));
        assert!(text.starts_with("error: missing data"));

        let bad = Conditions {
            month: 13,
            ..Default::default()
        };
        assert!(respond(svc.estimate(&bad)).starts_with("error: invalid input"));
    }

    #[test]
    fn feature_table_lists_all_names() {
        let svc = service(Some(history(50.0)));
        let fv = svc.features_at(&query(180, None)).unwrap();
        let table = render_features(&fv);
        assert_eq!(table.lines().count(), 12);
        assert!(table.contains("pm25_lag_168h = 50.0000"));
    }
}
