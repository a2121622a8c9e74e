//! Persistent store abstraction
//!
//! Services receive a [`UniformityStore`] at construction and group their
//! writes in a [`StoreTransaction`]. A transaction that is dropped without
//! `commit` leaves the store untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    Comment, Evaluation, IrrigationUnit, MeasurementPoint, Property, UniformityCoefficients,
    UnitDetails, UnitRef, UnitType,
};
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::{FailPoint, InMemoryStore, MemoryTransaction};
pub use postgres::{PgStore, PgStoreTransaction};

/// Failures of the underlying store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Evaluation row to insert; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub unit: UnitRef,
    pub irrigated_area: f64,
    pub water_volume: f64,
    pub irrigation_duration: f64,
    pub coefficients: UniformityCoefficients,
    pub offline: bool,
    pub evaluator_id: Uuid,
}

impl NewEvaluation {
    pub fn into_evaluation(self, id: Uuid, recorded_at: DateTime<Utc>) -> Evaluation {
        Evaluation {
            id,
            recorded_at,
            unit: self.unit,
            irrigated_area: self.irrigated_area,
            water_volume: self.water_volume,
            irrigation_duration: self.irrigation_duration,
            coefficients: self.coefficients,
            offline: self.offline,
            evaluator_id: self.evaluator_id,
        }
    }
}

/// Irrigation unit row to insert
#[derive(Debug, Clone)]
pub struct NewIrrigationUnit {
    pub property_id: Uuid,
    pub identification: String,
    pub area_ha: f64,
    pub details: UnitDetails,
}

/// Read side of the store plus the transaction entry point
#[async_trait]
pub trait UniformityStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Open a unit of work
    async fn begin(&self) -> StoreResult<Self::Transaction>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;

    async fn find_property(&self, property_id: Uuid) -> StoreResult<Option<Property>>;

    /// Look a unit up in the table matching its type only
    async fn find_unit(&self, unit: UnitRef) -> StoreResult<Option<IrrigationUnit>>;

    async fn list_units(
        &self,
        property_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>>;

    /// Units of one type on every property owned by `owner_id`
    async fn list_owned_units(
        &self,
        owner_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>>;

    async fn count_evaluations(&self, unit: UnitRef) -> StoreResult<i64>;

    /// Number of measurement points over all evaluations of a unit
    async fn count_points(&self, unit: UnitRef) -> StoreResult<i64>;

    async fn find_evaluation(&self, evaluation_id: Uuid) -> StoreResult<Option<Evaluation>>;

    /// Evaluations of a unit, newest first
    async fn list_evaluations(
        &self,
        unit: UnitRef,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Evaluation>>;

    /// Points of an evaluation ordered by sequence
    async fn list_points(&self, evaluation_id: Uuid) -> StoreResult<Vec<MeasurementPoint>>;

    /// Comments of an evaluation, oldest first
    async fn list_comments(&self, evaluation_id: Uuid) -> StoreResult<Vec<Comment>>;
}

/// Writes grouped into one all-or-nothing unit of work
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_unit(&mut self, unit: &NewIrrigationUnit) -> StoreResult<IrrigationUnit>;

    /// Overwrite identification, area and details of an existing unit
    async fn update_unit(&mut self, unit: &IrrigationUnit) -> StoreResult<IrrigationUnit>;

    /// Evaluations referencing `unit`, counted with the unit row locked
    /// against new references until the transaction ends
    async fn count_unit_evaluations(&mut self, unit: UnitRef) -> StoreResult<i64>;

    async fn delete_unit(&mut self, unit: UnitRef) -> StoreResult<u64>;

    async fn insert_evaluation(&mut self, evaluation: &NewEvaluation) -> StoreResult<Evaluation>;

    /// Insert points into the schema matching each point's position
    async fn insert_points(
        &mut self,
        evaluation_id: Uuid,
        points: &[MeasurementPoint],
    ) -> StoreResult<u64>;

    async fn insert_comment(&mut self, evaluation_id: Uuid, text: &str) -> StoreResult<Comment>;

    async fn delete_comment_photos(&mut self, evaluation_id: Uuid) -> StoreResult<u64>;

    async fn delete_comments(&mut self, evaluation_id: Uuid) -> StoreResult<u64>;

    async fn delete_sector_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64>;

    async fn delete_pivot_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64>;

    async fn delete_evaluation(&mut self, evaluation_id: Uuid) -> StoreResult<u64>;

    async fn commit(self) -> StoreResult<()>;
}
