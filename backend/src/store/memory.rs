//! In-process store used by the service tests
//!
//! A transaction works on a copy of the state taken at `begin` and swaps it
//! in on `commit`. Concurrent writers are last-commit-wins, which is enough
//! for single-request tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    Comment, CommentPhoto, Evaluation, IrrigationUnit, MeasurementPoint, MediaReference,
    PointPosition, Property, UnitRef, UnitType,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    NewEvaluation, NewIrrigationUnit, StoreError, StoreResult, StoreTransaction, UniformityStore,
};

/// Transaction step that should fail on the next unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertUnit,
    UpdateUnit,
    DeleteUnit,
    InsertEvaluation,
    InsertPoints,
    InsertComment,
    DeleteCommentPhotos,
    DeleteComments,
    DeleteSectorPoints,
    DeletePivotPoints,
    DeleteEvaluation,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    properties: HashMap<Uuid, Property>,
    units: HashMap<UnitRef, IrrigationUnit>,
    // Insertion order
    evaluations: Vec<Evaluation>,
    sector_points: Vec<(Uuid, MeasurementPoint)>,
    pivot_points: Vec<(Uuid, MeasurementPoint)>,
    comments: Vec<Comment>,
    photos: Vec<CommentPhoto>,
}

impl MemoryState {
    fn points_of(&self, unit_type: UnitType) -> &[(Uuid, MeasurementPoint)] {
        match unit_type {
            UnitType::HydraulicSector => &self.sector_points,
            UnitType::CentralPivot => &self.pivot_points,
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following transaction fail at `point`
    pub async fn fail_on(&self, point: FailPoint) {
        *self.fail_point.lock().await = Some(point);
    }

    pub async fn clear_failure(&self) {
        *self.fail_point.lock().await = None;
    }

    pub async fn insert_property(&self, property: Property) {
        self.state
            .lock()
            .await
            .properties
            .insert(property.id, property);
    }

    pub async fn insert_unit(&self, unit: IrrigationUnit) {
        self.state.lock().await.units.insert(unit.unit_ref(), unit);
    }

    /// Attach a photo to an existing comment
    pub async fn attach_photo(
        &self,
        comment_id: Uuid,
        media: MediaReference,
    ) -> StoreResult<CommentPhoto> {
        let mut state = self.state.lock().await;
        if !state.comments.iter().any(|c| c.id == comment_id) {
            return Err(StoreError::Backend(format!(
                "comment {} does not exist",
                comment_id
            )));
        }

        let photo = CommentPhoto {
            id: Uuid::new_v4(),
            comment_id,
            media,
        };
        state.photos.push(photo.clone());
        Ok(photo)
    }

    pub async fn evaluation_count(&self) -> usize {
        self.state.lock().await.evaluations.len()
    }

    pub async fn point_count(&self) -> usize {
        let state = self.state.lock().await;
        state.sector_points.len() + state.pivot_points.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }

    pub async fn photo_count(&self) -> usize {
        self.state.lock().await.photos.len()
    }

    pub async fn unit_count(&self) -> usize {
        self.state.lock().await.units.len()
    }
}

pub struct MemoryTransaction {
    staged: MemoryState,
    shared: Arc<Mutex<MemoryState>>,
    fail_point: Option<FailPoint>,
}

impl MemoryTransaction {
    fn check(&self, step: FailPoint) -> StoreResult<()> {
        if self.fail_point == Some(step) {
            return Err(StoreError::Backend(format!("injected failure at {:?}", step)));
        }
        Ok(())
    }
}

#[async_trait]
impl UniformityStore for InMemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> StoreResult<MemoryTransaction> {
        let staged = self.state.lock().await.clone();
        let fail_point = *self.fail_point.lock().await;
        Ok(MemoryTransaction {
            staged,
            shared: Arc::clone(&self.state),
            fail_point,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_property(&self, property_id: Uuid) -> StoreResult<Option<Property>> {
        Ok(self.state.lock().await.properties.get(&property_id).cloned())
    }

    async fn find_unit(&self, unit: UnitRef) -> StoreResult<Option<IrrigationUnit>> {
        Ok(self.state.lock().await.units.get(&unit).cloned())
    }

    async fn list_units(
        &self,
        property_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>> {
        let state = self.state.lock().await;
        let mut units: Vec<IrrigationUnit> = state
            .units
            .values()
            .filter(|u| u.property_id == property_id && u.unit_type() == unit_type)
            .cloned()
            .collect();
        units.sort_by(|a, b| a.identification.cmp(&b.identification));
        Ok(units)
    }

    async fn list_owned_units(
        &self,
        owner_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>> {
        let state = self.state.lock().await;
        let mut units: Vec<IrrigationUnit> = state
            .units
            .values()
            .filter(|u| u.unit_type() == unit_type)
            .filter(|u| {
                state
                    .properties
                    .get(&u.property_id)
                    .map_or(false, |p| p.owner_id == owner_id)
            })
            .cloned()
            .collect();
        units.sort_by(|a, b| a.identification.cmp(&b.identification));
        Ok(units)
    }

    async fn count_evaluations(&self, unit: UnitRef) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state.evaluations.iter().filter(|e| e.unit == unit).count() as i64)
    }

    async fn count_points(&self, unit: UnitRef) -> StoreResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .points_of(unit.unit_type())
            .iter()
            .filter(|(evaluation_id, _)| {
                state
                    .evaluations
                    .iter()
                    .any(|e| e.id == *evaluation_id && e.unit == unit)
            })
            .count();
        Ok(count as i64)
    }

    async fn find_evaluation(&self, evaluation_id: Uuid) -> StoreResult<Option<Evaluation>> {
        let state = self.state.lock().await;
        Ok(state
            .evaluations
            .iter()
            .find(|e| e.id == evaluation_id)
            .cloned())
    }

    async fn list_evaluations(
        &self,
        unit: UnitRef,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Evaluation>> {
        let state = self.state.lock().await;
        // Later inserts win ties on the timestamp
        let mut evaluations: Vec<Evaluation> = state
            .evaluations
            .iter()
            .rev()
            .filter(|e| e.unit == unit)
            .cloned()
            .collect();
        evaluations.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        if let Some(limit) = limit {
            evaluations.truncate(limit.max(0) as usize);
        }
        Ok(evaluations)
    }

    async fn list_points(&self, evaluation_id: Uuid) -> StoreResult<Vec<MeasurementPoint>> {
        let state = self.state.lock().await;
        let mut points: Vec<MeasurementPoint> = state
            .sector_points
            .iter()
            .chain(state.pivot_points.iter())
            .filter(|(id, _)| *id == evaluation_id)
            .map(|(_, p)| p.clone())
            .collect();
        points.sort_by_key(|p| p.sequence);
        Ok(points)
    }

    async fn list_comments(&self, evaluation_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.evaluation_id == evaluation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_unit(&mut self, unit: &NewIrrigationUnit) -> StoreResult<IrrigationUnit> {
        self.check(FailPoint::InsertUnit)?;
        if !self.staged.properties.contains_key(&unit.property_id) {
            return Err(StoreError::Backend(format!(
                "property {} does not exist",
                unit.property_id
            )));
        }

        let created = IrrigationUnit {
            id: Uuid::new_v4(),
            property_id: unit.property_id,
            identification: unit.identification.clone(),
            area_ha: unit.area_ha,
            details: unit.details.clone(),
            created_at: Utc::now(),
        };
        self.staged.units.insert(created.unit_ref(), created.clone());
        Ok(created)
    }

    async fn update_unit(&mut self, unit: &IrrigationUnit) -> StoreResult<IrrigationUnit> {
        self.check(FailPoint::UpdateUnit)?;
        let stored = self.staged.units.get_mut(&unit.unit_ref()).ok_or_else(|| {
            StoreError::Backend(format!("{} {} does not exist", unit.unit_type(), unit.id))
        })?;

        stored.identification = unit.identification.clone();
        stored.area_ha = unit.area_ha;
        stored.details = unit.details.clone();
        Ok(stored.clone())
    }

    async fn count_unit_evaluations(&mut self, unit: UnitRef) -> StoreResult<i64> {
        Ok(self
            .staged
            .evaluations
            .iter()
            .filter(|e| e.unit == unit)
            .count() as i64)
    }

    async fn delete_unit(&mut self, unit: UnitRef) -> StoreResult<u64> {
        self.check(FailPoint::DeleteUnit)?;
        if self.staged.evaluations.iter().any(|e| e.unit == unit) {
            return Err(StoreError::Backend(format!(
                "{} {} is still referenced by evaluations",
                unit.unit_type(),
                unit.id()
            )));
        }
        Ok(self.staged.units.remove(&unit).map_or(0, |_| 1))
    }

    async fn insert_evaluation(&mut self, evaluation: &NewEvaluation) -> StoreResult<Evaluation> {
        self.check(FailPoint::InsertEvaluation)?;
        if !self.staged.units.contains_key(&evaluation.unit) {
            return Err(StoreError::Backend(format!(
                "{} {} does not exist",
                evaluation.unit.unit_type(),
                evaluation.unit.id()
            )));
        }

        let created = evaluation.clone().into_evaluation(Uuid::new_v4(), Utc::now());
        self.staged.evaluations.push(created.clone());
        Ok(created)
    }

    async fn insert_points(
        &mut self,
        evaluation_id: Uuid,
        points: &[MeasurementPoint],
    ) -> StoreResult<u64> {
        self.check(FailPoint::InsertPoints)?;
        for point in points {
            let row = (evaluation_id, point.clone());
            match point.position {
                PointPosition::Sector { .. } => self.staged.sector_points.push(row),
                PointPosition::Pivot { .. } => self.staged.pivot_points.push(row),
            }
        }
        Ok(points.len() as u64)
    }

    async fn insert_comment(&mut self, evaluation_id: Uuid, text: &str) -> StoreResult<Comment> {
        self.check(FailPoint::InsertComment)?;
        let comment = Comment {
            id: Uuid::new_v4(),
            evaluation_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.staged.comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete_comment_photos(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        self.check(FailPoint::DeleteCommentPhotos)?;
        let comment_ids: Vec<Uuid> = self
            .staged
            .comments
            .iter()
            .filter(|c| c.evaluation_id == evaluation_id)
            .map(|c| c.id)
            .collect();
        let before = self.staged.photos.len();
        self.staged
            .photos
            .retain(|p| !comment_ids.contains(&p.comment_id));
        Ok((before - self.staged.photos.len()) as u64)
    }

    async fn delete_comments(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        self.check(FailPoint::DeleteComments)?;
        let before = self.staged.comments.len();
        self.staged
            .comments
            .retain(|c| c.evaluation_id != evaluation_id);
        Ok((before - self.staged.comments.len()) as u64)
    }

    async fn delete_sector_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        self.check(FailPoint::DeleteSectorPoints)?;
        let before = self.staged.sector_points.len();
        self.staged
            .sector_points
            .retain(|(id, _)| *id != evaluation_id);
        Ok((before - self.staged.sector_points.len()) as u64)
    }

    async fn delete_pivot_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        self.check(FailPoint::DeletePivotPoints)?;
        let before = self.staged.pivot_points.len();
        self.staged
            .pivot_points
            .retain(|(id, _)| *id != evaluation_id);
        Ok((before - self.staged.pivot_points.len()) as u64)
    }

    async fn delete_evaluation(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        self.check(FailPoint::DeleteEvaluation)?;
        let before = self.staged.evaluations.len();
        self.staged.evaluations.retain(|e| e.id != evaluation_id);
        Ok((before - self.staged.evaluations.len()) as u64)
    }

    async fn commit(self) -> StoreResult<()> {
        self.check(FailPoint::Commit)?;
        *self.shared.lock().await = self.staged;
        Ok(())
    }
}
