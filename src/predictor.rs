use std::sync::Arc;

use crate::error::{PredictError, Result};
use crate::features::FeatureBuilder;
use crate::model::Model;
use crate::types::{Conditions, FeatureVector, Prediction, N_FEATURES};

/// Runs the shared model on feature vectors.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<Model>,
}

impl Predictor {
    pub fn new(model: Arc<Model>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// PM2.5 estimate for one feature vector. Concentrations below zero
    /// are reported as zero; a NaN output is passed through unchanged and
    /// lands in the unsafe advisory band.
    pub fn predict(&self, features: FeatureVector) -> Prediction {
        let raw = self.model.evaluate(features.values());
        let pm25 = if raw.is_nan() { raw } else { raw.max(0.0) };
        Prediction { pm25, features }
    }

    /// Evaluates an all-zero input and the typical manual conditions once,
    /// so an artifact that overflows surfaces at startup.
    ///
    /// # Errors
    /// `ModelLoad` if either output is not finite.
    pub fn warmup(&self) -> Result<f64> {
        let typical = FeatureBuilder::new().from_conditions(&Conditions::default())?;
        let probes = [("zero", [0.0; N_FEATURES]), ("typical", *typical.values())];

        let mut last = 0.0;
        for (name, x) in probes {
            let out = self.model.evaluate(&x);
            if !out.is_finite() {
                return Err(PredictError::ModelLoad(format!(
                    "warmup on {name} input produced non-finite output ({out})"
                )));
            }
            last = out;
        }
        tracing::info!("warmup forward ok (output {:.3})", last);
        Ok(last)
    }
}
