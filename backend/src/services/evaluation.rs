//! Field evaluation service: create, read and delete uniformity evaluations

use serde::{Deserialize, Serialize};
use shared::{ClassifiedCoefficients, Comment, Evaluation, MeasurementPoint, UnitRef};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::recorder::{EvaluationCreated, EvaluationRecorder};
use crate::services::require_unit_owner;
use crate::store::{StoreTransaction, UniformityStore};

/// Evaluation service generic over the backing store
#[derive(Clone)]
pub struct EvaluationService<S> {
    store: S,
}

/// Input for recording an evaluation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEvaluationInput {
    pub unit: UnitRef,
    /// Irrigated area (ha)
    #[validate(range(min = 0.0))]
    pub irrigated_area: f64,
    /// Water volume applied (m³)
    #[validate(range(min = 0.0))]
    pub water_volume: f64,
    /// Irrigation duration (h)
    #[validate(range(min = 0.0))]
    pub irrigation_duration: f64,
    #[serde(default)]
    pub offline: bool,
    #[validate(length(min = 1, message = "At least one measurement point is required"))]
    pub points: Vec<MeasurementInput>,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[validate(length(max = 2000))]
    pub recommendations: Option<String>,
}

/// One collector reading as sent by the field client
///
/// Sector readings carry `x`/`y`, pivot readings carry `distance_m` and
/// `collector_diameter_mm`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementInput {
    pub sequence: Option<i32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub distance_m: Option<f64>,
    pub collector_diameter_mm: Option<f64>,
    pub volume_ml: f64,
    pub duration_s: f64,
    pub flow_rate_l_h: Option<f64>,
}

/// Evaluation with its classification
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub classification: ClassifiedCoefficients,
}

impl From<Evaluation> for EvaluationSummary {
    fn from(evaluation: Evaluation) -> Self {
        let classification = evaluation.coefficients.classify();
        Self {
            evaluation,
            classification,
        }
    }
}

/// Evaluation with its points and comments
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationDetail {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub classification: ClassifiedCoefficients,
    pub points: Vec<MeasurementPoint>,
    pub comment: Option<String>,
    pub recommendations: Option<String>,
    pub comments: Vec<Comment>,
}

impl<S: UniformityStore> EvaluationService<S> {
    /// Create a new EvaluationService instance
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record an evaluation with its points and comments in one transaction
    pub async fn create_evaluation(
        &self,
        evaluator_id: Uuid,
        input: CreateEvaluationInput,
    ) -> AppResult<EvaluationCreated> {
        input.validate()?;

        let unit = EvaluationRecorder::resolve_target(&self.store, input.unit).await?;

        let mut tx = self.store.begin().await?;
        let created = EvaluationRecorder::record(&mut tx, &unit, &input, evaluator_id).await?;
        tx.commit().await?;

        tracing::info!(
            evaluation_id = %created.id,
            unit_type = %unit.unit_type(),
            unit_id = %unit.id,
            points = created.point_count,
            cuc = created.coefficients.cuc.value,
            "Evaluation recorded"
        );

        Ok(created)
    }

    /// Get an evaluation with points, comments and classification
    pub async fn get_evaluation(&self, evaluation_id: Uuid) -> AppResult<EvaluationDetail> {
        let evaluation = self
            .store
            .find_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Evaluation".to_string()))?;

        let points = self.store.list_points(evaluation_id).await?;
        let comments = self.store.list_comments(evaluation_id).await?;

        let comment = comments
            .iter()
            .find(|c| !c.is_recommendation())
            .map(|c| c.text.clone());
        let recommendations = comments
            .iter()
            .find(|c| c.is_recommendation())
            .map(|c| c.body().to_string());

        Ok(EvaluationDetail {
            classification: evaluation.coefficients.classify(),
            evaluation,
            points,
            comment,
            recommendations,
            comments,
        })
    }

    /// List the evaluations of one unit, newest first
    pub async fn list_unit_evaluations(&self, unit: UnitRef) -> AppResult<Vec<EvaluationSummary>> {
        EvaluationRecorder::resolve_target(&self.store, unit).await?;

        let evaluations = self.store.list_evaluations(unit, None).await?;
        Ok(evaluations.into_iter().map(EvaluationSummary::from).collect())
    }

    /// Delete an evaluation with its points, comments and comment photos
    pub async fn delete_evaluation(&self, requester_id: Uuid, evaluation_id: Uuid) -> AppResult<()> {
        let evaluation = self
            .store
            .find_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Evaluation".to_string()))?;

        let unit = self
            .store
            .find_unit(evaluation.unit)
            .await?
            .ok_or_else(|| AppError::NotFound("Irrigation unit".to_string()))?;

        require_unit_owner(&self.store, &unit, requester_id).await?;

        let mut tx = self.store.begin().await?;
        let photos = tx.delete_comment_photos(evaluation_id).await?;
        let comments = tx.delete_comments(evaluation_id).await?;
        let sector_points = tx.delete_sector_points(evaluation_id).await?;
        let pivot_points = tx.delete_pivot_points(evaluation_id).await?;
        tx.delete_evaluation(evaluation_id).await?;
        tx.commit().await?;

        tracing::info!(
            evaluation_id = %evaluation_id,
            photos,
            comments,
            points = sector_points + pivot_points,
            "Evaluation deleted"
        );

        Ok(())
    }
}
