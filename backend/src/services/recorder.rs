//! Evaluation recorder
//!
//! Turns the raw collector readings of one field evaluation into stored
//! rows: flow rates are derived where missing, coefficients are computed
//! from the usable ones and the evaluation is written with its points and
//! comments. All writes go through the caller's transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    compute_coefficients, derive_flow_rate, free_text_comment, recommendations_comment,
    validate_collection, validate_collector_diameter, ClassifiedCoefficients, IrrigationUnit,
    MeasurementPoint, PointPosition, UniformityCoefficients, UnitRef, UnitType,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::evaluation::{CreateEvaluationInput, MeasurementInput};
use crate::store::{NewEvaluation, StoreTransaction, UniformityStore};

/// Result of recording an evaluation
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationCreated {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub unit: UnitRef,
    pub point_count: usize,
    pub coefficients: ClassifiedCoefficients,
}

pub struct EvaluationRecorder;

impl EvaluationRecorder {
    /// Resolve the referenced unit in the table of its own type
    pub async fn resolve_target<S: UniformityStore>(
        store: &S,
        unit: UnitRef,
    ) -> AppResult<IrrigationUnit> {
        store.find_unit(unit).await?.ok_or_else(|| {
            AppError::TargetNotFound(format!("{} {}", unit.unit_type().label(), unit.id()))
        })
    }

    /// Write one evaluation inside `tx`. The caller owns begin and commit.
    pub async fn record<T: StoreTransaction>(
        tx: &mut T,
        unit: &IrrigationUnit,
        input: &CreateEvaluationInput,
        evaluator_id: Uuid,
    ) -> AppResult<EvaluationCreated> {
        let points = prepare_points(unit.unit_type(), &input.points)?;
        let coefficients = coefficients_for(&points)?;

        let evaluation = tx
            .insert_evaluation(&NewEvaluation {
                unit: unit.unit_ref(),
                irrigated_area: input.irrigated_area,
                water_volume: input.water_volume,
                irrigation_duration: input.irrigation_duration,
                coefficients,
                offline: input.offline,
                evaluator_id,
            })
            .await?;

        tx.insert_points(evaluation.id, &points).await?;

        if let Some(text) = non_blank(input.comment.as_deref().map(free_text_comment)) {
            tx.insert_comment(evaluation.id, text).await?;
        }
        if let Some(text) = non_blank(input.recommendations.as_deref()) {
            tx.insert_comment(evaluation.id, &recommendations_comment(text))
                .await?;
        }

        Ok(EvaluationCreated {
            id: evaluation.id,
            recorded_at: evaluation.recorded_at,
            unit: evaluation.unit,
            point_count: points.len(),
            coefficients: coefficients.classify(),
        })
    }
}

/// Coefficients over the strictly positive flow rates, zero when none remain
pub fn coefficients_for(points: &[MeasurementPoint]) -> AppResult<UniformityCoefficients> {
    let flow_rates: Vec<f64> = points
        .iter()
        .filter(|p| p.is_usable())
        .map(|p| p.flow_rate_l_h)
        .collect();

    if flow_rates.is_empty() {
        return Ok(UniformityCoefficients::ZERO);
    }

    Ok(compute_coefficients(&flow_rates)?)
}

/// Validate the readings, fill in missing flow rates and shape each point
/// for the unit it was taken on
pub fn prepare_points(
    unit_type: UnitType,
    inputs: &[MeasurementInput],
) -> AppResult<Vec<MeasurementPoint>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| prepare_point(unit_type, index, input))
        .collect()
}

fn prepare_point(
    unit_type: UnitType,
    index: usize,
    input: &MeasurementInput,
) -> AppResult<MeasurementPoint> {
    let field = format!("points[{}]", index);
    let number = index + 1;

    validate_collection(input.volume_ml, input.duration_s).map_err(|msg| {
        AppError::invalid(
            &field,
            format!("Point {}: {}", number, msg),
            format!("Ponto {}: leitura do coletor inválida", number),
        )
    })?;

    let flow_rate_l_h = match input.flow_rate_l_h {
        Some(supplied) => supplied,
        None => derive_flow_rate(input.volume_ml, input.duration_s).map_err(|e| {
            AppError::invalid(
                &field,
                format!("Point {}: flow rate cannot be derived ({})", number, e),
                format!(
                    "Ponto {}: não é possível calcular a vazão com tempo de coleta zero",
                    number
                ),
            )
        })?,
    };

    let position = match unit_type {
        UnitType::HydraulicSector => {
            if input.distance_m.is_some() || input.collector_diameter_mm.is_some() {
                return Err(AppError::invalid(
                    &field,
                    format!("Point {}: hydraulic sector points take x/y coordinates", number),
                    format!("Ponto {}: pontos de setor usam coordenadas x/y", number),
                ));
            }
            PointPosition::Sector {
                x: input.x,
                y: input.y,
            }
        }
        UnitType::CentralPivot => {
            if input.x.is_some() || input.y.is_some() {
                return Err(AppError::invalid(
                    &field,
                    format!("Point {}: central pivot points take a radial distance", number),
                    format!("Ponto {}: pontos de pivô usam a distância radial", number),
                ));
            }
            let diameter = input.collector_diameter_mm.ok_or_else(|| {
                AppError::invalid(
                    &field,
                    format!("Point {}: collector diameter is required on a pivot", number),
                    format!("Ponto {}: informe o diâmetro do coletor", number),
                )
            })?;
            validate_collector_diameter(diameter).map_err(|msg| {
                AppError::invalid(
                    &field,
                    format!("Point {}: {}", number, msg),
                    format!("Ponto {}: diâmetro do coletor deve ser positivo", number),
                )
            })?;
            PointPosition::Pivot {
                distance_m: input.distance_m,
                collector_diameter_mm: diameter,
            }
        }
    };

    Ok(MeasurementPoint {
        sequence: input.sequence.unwrap_or(number as i32),
        position,
        volume_ml: input.volume_ml,
        duration_s: input.duration_s,
        flow_rate_l_h,
    })
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
