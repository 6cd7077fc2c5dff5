//! PM2.5 prediction for Beijing.
//!
//! Hourly observations are turned into a fixed 12-feature vector, scored by a
//! pre-trained regression model, and mapped to an outdoor-exercise advisory.

pub mod advisory;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod http;
pub mod model;
pub mod predictor;
pub mod service;
pub mod types;

pub use error::PredictError;
