//! Stateless uniformity calculator handlers
//!
//! Field clients use these to preview results before submitting an
//! evaluation.

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use shared::{
    classify, compute_coefficients, derive_flow_rate, ClassifiedCoefficients, CoefficientKind,
    UniformityCoefficients,
};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct FlowRateRequest {
    pub volume_ml: f64,
    pub duration_s: f64,
}

#[derive(Debug, Serialize)]
pub struct FlowRateResponse {
    pub flow_rate_l_h: f64,
}

#[derive(Debug, Deserialize)]
pub struct CoefficientsRequest {
    pub flow_rates: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct CoefficientsResponse {
    pub coefficients: UniformityCoefficients,
    pub classification: ClassifiedCoefficients,
}

/// Derive a flow rate (L/h) from a collected volume and time
pub async fn calculate_flow_rate(Json(input): Json<FlowRateRequest>) -> impl IntoResponse {
    match derive_flow_rate(input.volume_ml, input.duration_s) {
        Ok(flow_rate_l_h) => {
            (StatusCode::OK, Json(FlowRateResponse { flow_rate_l_h })).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Compute and classify CUC, CUD and CUE for a set of flow rates
pub async fn calculate_coefficients(Json(input): Json<CoefficientsRequest>) -> impl IntoResponse {
    match compute_coefficients(&input.flow_rates) {
        Ok(coefficients) => (
            StatusCode::OK,
            Json(CoefficientsResponse {
                classification: coefficients.classify(),
                coefficients,
            }),
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Classify one coefficient value
pub async fn classify_coefficient(Path((kind, value)): Path<(String, f64)>) -> impl IntoResponse {
    let kind: CoefficientKind = match kind.parse() {
        Ok(kind) => kind,
        Err(msg) => {
            return AppError::invalid("kind", msg, "Coeficiente inválido: use cuc, cud ou cue")
                .into_response()
        }
    };

    (StatusCode::OK, Json(classify(kind, value))).into_response()
}
