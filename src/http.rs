use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::PredictError;
use crate::service::{PredictionService, Report};
use crate::types::{Conditions, HourQuery};

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictError::MissingData(_) => StatusCode::NOT_FOUND,
            PredictError::ModelLoad(_) | PredictError::DataLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

#[derive(Deserialize, Debug)]
pub struct HourParams {
    at: String,
    location: Option<String>,
}

impl HourParams {
    fn into_query(self) -> Result<HourQuery, PredictError> {
        HourQuery::parse(&self.at, self.location)
    }
}

pub fn router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/model", get(model_info))
        .route("/predict", get(predict))
        .route("/features", get(features))
        .route("/estimate", post(estimate))
        .with_state(AppState { service })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn model_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let svc = &state.service;
    let meta = svc.model().meta();
    let history = svc.history().map(|h| {
        let (first, last) = match h.span() {
            Some((f, l)) => (Some(f), Some(l)),
            None => (None, None),
        };
        json!({ "rows": h.len(), "first": first, "last": last })
    });
    Json(json!({
        "name": meta.name,
        "kind": svc.model().kind(),
        "feat_list": meta.feat_list,
        "metrics": meta.metrics,
        "station": svc.station(),
        "history": history,
    }))
}

async fn predict(
    State(state): State<AppState>,
    params: Result<Query<HourParams>, QueryRejection>,
) -> Result<Json<Report>, PredictError> {
    let Query(params) = params.map_err(|e| PredictError::InvalidInput(e.body_text()))?;
    let query = params.into_query()?;
    state.service.predict_at(&query).map(Json)
}

async fn features(
    State(state): State<AppState>,
    params: Result<Query<HourParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, PredictError> {
    let Query(params) = params.map_err(|e| PredictError::InvalidInput(e.body_text()))?;
    let query = params.into_query()?;
    let fv = state.service.features_at(&query)?;
    // array, not an object, so the model's input order survives
    let named: Vec<serde_json::Value> = fv
        .named()
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    Ok(Json(serde_json::Value::Array(named)))
}

async fn estimate(
    State(state): State<AppState>,
    payload: Result<Json<Conditions>, JsonRejection>,
) -> Result<Json<Report>, PredictError> {
    let Json(conditions) = payload.map_err(|e| PredictError::InvalidInput(e.body_text()))?;
    state.service.estimate(&conditions).map(Json)
}
