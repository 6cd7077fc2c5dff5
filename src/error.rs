use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// Not enough history to build features for the requested hour.
    #[error("missing data: {0}")]
    MissingData(String),
    /// Model artifact unreadable or incompatible with the feature schema.
    #[error("model load failed: {0}")]
    ModelLoad(String),
    /// Historical dataset unreadable.
    #[error("dataset load failed: {0}")]
    DataLoad(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PredictError {
    /// Startup failures the process cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PredictError::ModelLoad(_) | PredictError::DataLoad(_))
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;
