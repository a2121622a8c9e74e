//! Area (hydraulic sector / central pivot) HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::{UnitRef, UnitType};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::area::{AreaService, CreateAreaInput, UpdateAreaInput};
use crate::services::evaluation::EvaluationService;
use crate::AppState;

fn area_service(state: &AppState) -> AreaService<crate::store::PgStore> {
    AreaService::new(state.store.clone()).with_recent_limit(state.config.evaluation.recent_limit)
}

/// `?unit_type=hydraulic_sector|central_pivot`
#[derive(Debug, Deserialize)]
pub struct UnitTypeQuery {
    pub unit_type: String,
}

fn parse_unit_ref(unit_type: &str, id: Uuid) -> Result<UnitRef, AppError> {
    let unit_type: UnitType = unit_type.parse().map_err(|msg: String| {
        AppError::invalid(
            "unit_type",
            msg,
            "Tipo de unidade inválido: use hydraulic_sector ou central_pivot",
        )
    })?;
    Ok(UnitRef::new(unit_type, id))
}

/// Create a sector or pivot on a property owned by the caller
pub async fn create_area(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAreaInput>,
) -> impl IntoResponse {
    let service = area_service(&state);

    match service.create_area(current_user.0.user_id, input).await {
        Ok(unit) => (StatusCode::CREATED, Json(unit)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List the areas on every property of the caller
pub async fn list_my_areas(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = area_service(&state);

    match service.list_owned_areas(current_user.0.user_id).await {
        Ok(areas) => (StatusCode::OK, Json(areas)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update the identification, area or details of an area
pub async fn update_area(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
    Query(query): Query<UnitTypeQuery>,
    Json(input): Json<UpdateAreaInput>,
) -> impl IntoResponse {
    let unit_ref = match parse_unit_ref(&query.unit_type, unit_id) {
        Ok(unit_ref) => unit_ref,
        Err(e) => return e.into_response(),
    };
    let service = area_service(&state);

    match service
        .update_area(current_user.0.user_id, unit_ref, input)
        .await
    {
        Ok(unit) => (StatusCode::OK, Json(unit)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List all areas of a property with their latest evaluations
pub async fn list_property_areas(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(property_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = area_service(&state);

    match service.list_areas(property_id).await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one area by id
pub async fn get_area(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = area_service(&state);

    match service.find_area(unit_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete an area without evaluations
pub async fn delete_area(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
    Query(query): Query<UnitTypeQuery>,
) -> impl IntoResponse {
    let unit_ref = match parse_unit_ref(&query.unit_type, unit_id) {
        Ok(unit_ref) => unit_ref,
        Err(e) => return e.into_response(),
    };
    let service = area_service(&state);

    match service.delete_area(current_user.0.user_id, unit_ref).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// List all evaluations of an area, newest first
pub async fn list_area_evaluations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
    Query(query): Query<UnitTypeQuery>,
) -> impl IntoResponse {
    let unit_ref = match parse_unit_ref(&query.unit_type, unit_id) {
        Ok(unit_ref) => unit_ref,
        Err(e) => return e.into_response(),
    };
    let service = EvaluationService::new(state.store.clone());

    match service.list_unit_evaluations(unit_ref).await {
        Ok(evaluations) => (
            StatusCode::OK,
            Json(serde_json::json!({ "evaluations": evaluations })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
