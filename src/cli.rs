use clap::{Parser, Subcommand};

use crate::service::{self, PredictionService};
use crate::types::{Conditions, HourQuery};

#[derive(Parser, Debug)]
#[command(name = "pm25_predictor", about = "Beijing PM2.5 predictor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Predict a recorded hour from the historical dataset
    Predict {
        /// Hour to predict, e.g. 2014-12-31T12
        #[arg(long)]
        at: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Show the model inputs for a recorded hour
    Features {
        #[arg(long)]
        at: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Predict from manually entered conditions
    Estimate {
        #[arg(long, default_value_t = 12)]
        hour: u32,
        #[arg(long, default_value_t = 6)]
        month: u32,
        #[arg(long)]
        weekend: bool,
        /// Temperature (°C)
        #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
        temp: f64,
        /// Pressure (hPa)
        #[arg(long, default_value_t = 1013.0)]
        pres: f64,
        /// Cumulated wind speed
        #[arg(long, default_value_t = 5.0)]
        wind: f64,
        /// Dew point (°C)
        #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
        dew: f64,
        /// PM2.5 24h ago (µg/m³)
        #[arg(long, default_value_t = 80.0)]
        lag24: f64,
        /// PM2.5 168h ago (µg/m³)
        #[arg(long, default_value_t = 75.0)]
        lag168: f64,
    },
}

/// Text produced by a one-shot command and whether it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub text: String,
    pub success: bool,
}

/// Runs a one-shot command. Returns `None` for `serve`, which the caller
/// hosts itself.
pub fn run_once(command: Command, svc: &PredictionService) -> Option<Outcome> {
    let result = match command {
        Command::Serve => return None,
        Command::Predict { at, location } => {
            HourQuery::parse(&at, location).and_then(|q| svc.predict_at(&q))
        }
        Command::Features { at, location } => {
            let features = HourQuery::parse(&at, location).and_then(|q| svc.features_at(&q));
            return Some(match features {
                Ok(fv) => Outcome {
                    text: service::render_features(&fv),
                    success: true,
                },
                Err(e) => Outcome {
                    text: format!("error: {e}\n"),
                    success: false,
                },
            });
        }
        Command::Estimate {
            hour,
            month,
            weekend,
            temp,
            pres,
            wind,
            dew,
            lag24,
            lag168,
        } => svc.estimate(&Conditions {
            hour,
            month,
            is_weekend: weekend,
            temperature: temp,
            pressure: pres,
            wind_speed: wind,
            dew_point: dew,
            pm25_lag_24h: lag24,
            pm25_lag_168h: lag168,
        }),
    };

    let success = result.is_ok();
    Some(Outcome {
        text: service::respond(result),
        success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::model::tests::{forest_json, meta_json};
    use crate::model::Model;
    use crate::predictor::Predictor;
    use crate::types::Observation;
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    fn service() -> PredictionService {
        let start = NaiveDate::from_ymd_opt(2013, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let history = History::from_observations((0..200).map(|i| Observation {
            timestamp: start + Duration::hours(i),
            pm25: Some(150.0),
            dew_point: -10.0,
            temperature: -2.0,
            pressure: 1030.0,
            wind_direction: "NW".into(),
            wind_speed: 3.0,
        }));
        let model = Model::from_json(&forest_json(), &meta_json()).unwrap();
        PredictionService::new(Predictor::new(Arc::new(model)), Some(history), "Beijing")
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["pm25_predictor"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.unwrap_or(Command::Serve)
    }

    #[test]
    fn no_subcommand_means_serve() {
        assert_eq!(parse(&[]), Command::Serve);
        assert_eq!(run_once(Command::Serve, &service()), None);
    }

    #[test]
    fn predict_renders_report() {
        let out = run_once(parse(&["predict", "--at", "2013-01-08T12"]), &service()).unwrap();
        assert!(out.success);
        assert!(out.text.contains("Predicted PM2.5 at 2013-01-08 12:00 (Beijing): 160.0 µg/m³"));
        assert!(out.text.contains("Advisory: unsafe."));
    }

    #[test]
    fn predict_failures_are_messages() {
        let svc = service();
        let out = run_once(parse(&["predict", "--at", "2013-01-01T03"]), &svc).unwrap();
        assert!(!out.success);
        assert!(out.text.starts_with("error: missing data"));

        let out = run_once(
            parse(&["predict", "--at", "2013-01-08T12", "--location", "Tokyo"]),
            &svc,
        )
        .unwrap();
        assert!(!out.success);
        assert!(out.text.starts_with("error: invalid input"));
    }

    #[test]
    fn features_lists_inputs_in_order() {
        let out = run_once(parse(&["features", "--at", "2013-01-08T12"]), &service()).unwrap();
        assert!(out.success);
        let names: Vec<&str> = out
            .text
            .lines()
            .map(|l| l.split('=').next().unwrap().trim())
            .collect();
        assert_eq!(names, crate::types::FEATURE_NAMES);

        let out = run_once(parse(&["features", "--at", "noon"]), &service()).unwrap();
        assert!(!out.success);
    }

    #[test]
    fn estimate_accepts_negative_temperatures() {
        let cmd = parse(&["estimate", "--hour", "7", "--temp", "-5", "--dew", "-12", "--weekend"]);
        match &cmd {
            Command::Estimate { temp, dew, weekend, .. } => {
                assert_eq!(*temp, -5.0);
                assert_eq!(*dew, -12.0);
                assert!(*weekend);
            }
            other => panic!("parsed {other:?}"),
        }
        let out = run_once(cmd, &service()).unwrap();
        assert!(out.success);
        assert!(out.text.contains("Predicted PM2.5 at 07:00"));

        let out = run_once(parse(&["estimate", "--month", "13"]), &service()).unwrap();
        assert!(!out.success);
        assert!(out.text.contains("month"));
    }
}
