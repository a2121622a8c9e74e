//! Field evaluation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::evaluation::{CreateEvaluationInput, EvaluationService};
use crate::AppState;

/// Record an evaluation; the caller is the evaluator
pub async fn create_evaluation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateEvaluationInput>,
) -> impl IntoResponse {
    let service = EvaluationService::new(state.store.clone());

    match service.create_evaluation(current_user.0.user_id, input).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get an evaluation with its points and comments
pub async fn get_evaluation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(evaluation_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = EvaluationService::new(state.store.clone());

    match service.get_evaluation(evaluation_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete an evaluation of a unit owned by the caller
pub async fn delete_evaluation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(evaluation_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = EvaluationService::new(state.store.clone());

    match service
        .delete_evaluation(current_user.0.user_id, evaluation_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
