use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{PredictError, Result};
use crate::types::{FEATURE_NAMES, N_FEATURES};

#[derive(Deserialize)]
struct MetaJson {
    feat_list: Vec<String>,
    in_dim: Option<usize>,
    model_name: Option<String>,
    metrics: Option<ModelMetrics>,
}

/// Hold-out scores recorded when the model was trained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    pub r2: f64,
}

/// Descriptive metadata shipped next to the estimator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMeta {
    pub name: Option<String>,
    pub feat_list: Vec<String>,
    pub metrics: Option<ModelMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, t: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(PredictError::ModelLoad(format!("tree {t} has no nodes")));
        }
        let n = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= N_FEATURES {
                        return Err(PredictError::ModelLoad(format!(
                            "tree {t} node {i}: feature index {feature} out of range"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(PredictError::ModelLoad(format!(
                            "tree {t} node {i}: non-finite threshold"
                        )));
                    }
                    // children must come after their parent, so every walk terminates
                    for child in [left, right] {
                        if child <= i || child >= n {
                            return Err(PredictError::ModelLoad(format!(
                                "tree {t} node {i}: bad child index {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(PredictError::ModelLoad(format!(
                            "tree {t} node {i}: non-finite leaf value"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64; N_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// The regression estimator, tagged by `kind` in `model.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Estimator {
    RandomForest { trees: Vec<Tree> },
    Linear { intercept: f64, coefficients: Vec<f64> },
}

impl Estimator {
    fn validate(&self) -> Result<()> {
        match self {
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(PredictError::ModelLoad("random forest has no trees".into()));
                }
                trees.iter().enumerate().try_for_each(|(t, tree)| tree.validate(t))
            }
            Estimator::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != N_FEATURES {
                    return Err(PredictError::ModelLoad(format!(
                        "linear model has {} coefficients, expected {}",
                        coefficients.len(),
                        N_FEATURES
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(PredictError::ModelLoad(
                        "linear model has non-finite weights".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Estimator::RandomForest { .. } => "random_forest",
            Estimator::Linear { .. } => "linear",
        }
    }
}

/// A loaded, validated model. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Model {
    estimator: Estimator,
    meta: ModelMeta,
}

impl Model {
    /// Reads `model.json` and `meta.json` from disk.
    ///
    /// # Errors
    /// `ModelLoad` when either file is unreadable or malformed, or the
    /// declared feature list differs from the expected 12-feature order.
    pub fn load(model_path: &Path, meta_path: &Path) -> Result<Self> {
        let meta_txt = fs::read_to_string(meta_path).map_err(|e| {
            PredictError::ModelLoad(format!("failed to read meta at {}: {e}", meta_path.display()))
        })?;
        let model_txt = fs::read_to_string(model_path).map_err(|e| {
            PredictError::ModelLoad(format!(
                "failed to read model at {}: {e}",
                model_path.display()
            ))
        })?;
        Self::from_json(&model_txt, &meta_txt)
    }

    pub fn from_json(model_json: &str, meta_json: &str) -> Result<Self> {
        let meta: MetaJson = serde_json::from_str(meta_json)
            .map_err(|e| PredictError::ModelLoad(format!("failed to parse meta.json: {e}")))?;
        check_schema(&meta)?;

        let estimator: Estimator = serde_json::from_str(model_json)
            .map_err(|e| PredictError::ModelLoad(format!("failed to parse model.json: {e}")))?;
        estimator.validate()?;

        let model = Self {
            estimator,
            meta: ModelMeta {
                name: meta.model_name,
                feat_list: meta.feat_list,
                metrics: meta.metrics,
            },
        };
        tracing::info!(
            "loaded {} model; feat_list[{}]: {:?}",
            model.kind(),
            model.meta.feat_list.len(),
            &model.meta.feat_list
        );
        Ok(model)
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn kind(&self) -> &'static str {
        self.estimator.kind()
    }

    /// Raw estimator output for an ordered input.
    pub fn evaluate(&self, x: &[f64; N_FEATURES]) -> f64 {
        match &self.estimator {
            Estimator::RandomForest { trees } => {
                let sum: f64 = trees.iter().map(|t| t.evaluate(x)).sum();
                sum / trees.len() as f64
            }
            Estimator::Linear {
                intercept,
                coefficients,
            } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(x.iter())
                        .map(|(c, v)| c * v)
                        .sum::<f64>()
            }
        }
    }
}

fn check_schema(meta: &MetaJson) -> Result<()> {
    if let Some(in_dim) = meta.in_dim {
        if in_dim != N_FEATURES {
            return Err(PredictError::ModelLoad(format!(
                "meta.in_dim is {in_dim}, expected {N_FEATURES}"
            )));
        }
    }
    if meta.feat_list.len() != N_FEATURES {
        return Err(PredictError::ModelLoad(format!(
            "feature list has {} entries, expected {}",
            meta.feat_list.len(),
            N_FEATURES
        )));
    }
    for (i, (got, want)) in meta.feat_list.iter().zip(FEATURE_NAMES.iter()).enumerate() {
        if got != want {
            return Err(PredictError::ModelLoad(format!(
                "feature {i} is '{got}', expected '{want}'"
            )));
        }
    }
    Ok(())
}
