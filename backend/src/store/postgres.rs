//! PostgreSQL store backed by sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    Comment, Evaluation, IrrigationUnit, MeasurementPoint, PivotDetails, PointPosition, Property,
    SectorDetails, UniformityCoefficients, UnitDetails, UnitRef, UnitType,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    NewEvaluation, NewIrrigationUnit, StoreError, StoreResult, StoreTransaction, UniformityStore,
};

/// Store handle shared by the request handlers
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Open Postgres transaction; rolls back when dropped uncommitted
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

fn unit_table(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::HydraulicSector => "hydraulic_sectors",
        UnitType::CentralPivot => "central_pivots",
    }
}

fn evaluation_unit_column(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::HydraulicSector => "hydraulic_sector_id",
        UnitType::CentralPivot => "central_pivot_id",
    }
}

fn point_table(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::HydraulicSector => "sector_points",
        UnitType::CentralPivot => "pivot_points",
    }
}

fn unit_details_json(details: &UnitDetails) -> StoreResult<serde_json::Value> {
    match details {
        UnitDetails::HydraulicSector(details) => serde_json::to_value(details),
        UnitDetails::CentralPivot(details) => serde_json::to_value(details),
    }
    .map_err(|e| StoreError::Backend(e.to_string()))
}

const EVALUATION_COLUMNS: &str = "id, recorded_at, unit_type, hydraulic_sector_id, central_pivot_id, \
     irrigated_area, water_volume, irrigation_duration, cuc, cud, cue, offline, evaluator_id";

/// Database row for a property
#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    municipality: Option<String>,
    state: Option<String>,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Property {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            municipality: row.municipality,
            state: row.state,
        }
    }
}

/// Database row shared by `hydraulic_sectors` and `central_pivots`
#[derive(Debug, sqlx::FromRow)]
struct UnitRow {
    id: Uuid,
    property_id: Uuid,
    identification: String,
    area_ha: f64,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl UnitRow {
    fn into_unit(self, unit_type: UnitType) -> StoreResult<IrrigationUnit> {
        let details = match unit_type {
            UnitType::HydraulicSector => UnitDetails::HydraulicSector(
                serde_json::from_value::<SectorDetails>(self.details)
                    .map_err(|e| StoreError::Corrupt(format!("sector {}: {}", self.id, e)))?,
            ),
            UnitType::CentralPivot => UnitDetails::CentralPivot(
                serde_json::from_value::<PivotDetails>(self.details)
                    .map_err(|e| StoreError::Corrupt(format!("pivot {}: {}", self.id, e)))?,
            ),
        };

        Ok(IrrigationUnit {
            id: self.id,
            property_id: self.property_id,
            identification: self.identification,
            area_ha: self.area_ha,
            details,
            created_at: self.created_at,
        })
    }
}

/// Database row for an evaluation
#[derive(Debug, sqlx::FromRow)]
struct EvaluationRow {
    id: Uuid,
    recorded_at: DateTime<Utc>,
    unit_type: String,
    hydraulic_sector_id: Option<Uuid>,
    central_pivot_id: Option<Uuid>,
    irrigated_area: f64,
    water_volume: f64,
    irrigation_duration: f64,
    cuc: f64,
    cud: f64,
    cue: f64,
    offline: bool,
    evaluator_id: Uuid,
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = StoreError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let unit_type: UnitType = row.unit_type.parse().map_err(StoreError::Corrupt)?;
        let unit = match (unit_type, row.hydraulic_sector_id, row.central_pivot_id) {
            (UnitType::HydraulicSector, Some(id), None) => UnitRef::HydraulicSector(id),
            (UnitType::CentralPivot, None, Some(id)) => UnitRef::CentralPivot(id),
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "evaluation {} does not reference exactly one {}",
                    row.id, unit_type
                )))
            }
        };

        Ok(Evaluation {
            id: row.id,
            recorded_at: row.recorded_at,
            unit,
            irrigated_area: row.irrigated_area,
            water_volume: row.water_volume,
            irrigation_duration: row.irrigation_duration,
            coefficients: UniformityCoefficients {
                cuc: row.cuc,
                cud: row.cud,
                cue: row.cue,
            },
            offline: row.offline,
            evaluator_id: row.evaluator_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SectorPointRow {
    sequence: i32,
    x: Option<f64>,
    y: Option<f64>,
    volume_ml: f64,
    duration_s: f64,
    flow_rate_l_h: f64,
}

impl From<SectorPointRow> for MeasurementPoint {
    fn from(row: SectorPointRow) -> Self {
        MeasurementPoint {
            sequence: row.sequence,
            position: PointPosition::Sector { x: row.x, y: row.y },
            volume_ml: row.volume_ml,
            duration_s: row.duration_s,
            flow_rate_l_h: row.flow_rate_l_h,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PivotPointRow {
    sequence: i32,
    distance_m: Option<f64>,
    collector_diameter_mm: f64,
    volume_ml: f64,
    duration_s: f64,
    flow_rate_l_h: f64,
}

impl From<PivotPointRow> for MeasurementPoint {
    fn from(row: PivotPointRow) -> Self {
        MeasurementPoint {
            sequence: row.sequence,
            position: PointPosition::Pivot {
                distance_m: row.distance_m,
                collector_diameter_mm: row.collector_diameter_mm,
            },
            volume_ml: row.volume_ml,
            duration_s: row.duration_s,
            flow_rate_l_h: row.flow_rate_l_h,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    evaluation_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            evaluation_id: row.evaluation_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UniformityStore for PgStore {
    type Transaction = PgStoreTransaction;

    async fn begin(&self) -> StoreResult<PgStoreTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTransaction { tx })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_property(&self, property_id: Uuid) -> StoreResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(
            "SELECT id, name, owner_id, municipality, state FROM properties WHERE id = $1",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Property::from))
    }

    async fn find_unit(&self, unit: UnitRef) -> StoreResult<Option<IrrigationUnit>> {
        let query = format!(
            "SELECT id, property_id, identification, area_ha, details, created_at FROM {} WHERE id = $1",
            unit_table(unit.unit_type())
        );
        let row = sqlx::query_as::<_, UnitRow>(&query)
            .bind(unit.id())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_unit(unit.unit_type())).transpose()
    }

    async fn list_units(
        &self,
        property_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>> {
        let query = format!(
            r#"
            SELECT id, property_id, identification, area_ha, details, created_at
            FROM {}
            WHERE property_id = $1
            ORDER BY identification
            "#,
            unit_table(unit_type)
        );
        let rows = sqlx::query_as::<_, UnitRow>(&query)
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_unit(unit_type)).collect()
    }

    async fn list_owned_units(
        &self,
        owner_id: Uuid,
        unit_type: UnitType,
    ) -> StoreResult<Vec<IrrigationUnit>> {
        let query = format!(
            r#"
            SELECT u.id, u.property_id, u.identification, u.area_ha, u.details, u.created_at
            FROM {} u
            JOIN properties p ON p.id = u.property_id
            WHERE p.owner_id = $1
            ORDER BY u.identification
            "#,
            unit_table(unit_type)
        );
        let rows = sqlx::query_as::<_, UnitRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_unit(unit_type)).collect()
    }

    async fn count_evaluations(&self, unit: UnitRef) -> StoreResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM evaluations WHERE {} = $1",
            evaluation_unit_column(unit.unit_type())
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(unit.id())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_points(&self, unit: UnitRef) -> StoreResult<i64> {
        let query = format!(
            r#"
            SELECT COUNT(*)
            FROM {} p
            JOIN evaluations e ON e.id = p.evaluation_id
            WHERE e.{} = $1
            "#,
            point_table(unit.unit_type()),
            evaluation_unit_column(unit.unit_type())
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(unit.id())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_evaluation(&self, evaluation_id: Uuid) -> StoreResult<Option<Evaluation>> {
        let query = format!("SELECT {} FROM evaluations WHERE id = $1", EVALUATION_COLUMNS);
        let row = sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(evaluation_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Evaluation::try_from).transpose()
    }

    async fn list_evaluations(
        &self,
        unit: UnitRef,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Evaluation>> {
        // LIMIT NULL means no limit in Postgres
        let query = format!(
            r#"
            SELECT {}
            FROM evaluations
            WHERE {} = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
            EVALUATION_COLUMNS,
            evaluation_unit_column(unit.unit_type())
        );
        let rows = sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(unit.id())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Evaluation::try_from).collect()
    }

    async fn list_points(&self, evaluation_id: Uuid) -> StoreResult<Vec<MeasurementPoint>> {
        let sector_rows = sqlx::query_as::<_, SectorPointRow>(
            r#"
            SELECT sequence, x, y, volume_ml, duration_s, flow_rate_l_h
            FROM sector_points
            WHERE evaluation_id = $1
            ORDER BY sequence
            "#,
        )
        .bind(evaluation_id)
        .fetch_all(&self.pool)
        .await?;

        let pivot_rows = sqlx::query_as::<_, PivotPointRow>(
            r#"
            SELECT sequence, distance_m, collector_diameter_mm, volume_ml, duration_s, flow_rate_l_h
            FROM pivot_points
            WHERE evaluation_id = $1
            ORDER BY sequence
            "#,
        )
        .bind(evaluation_id)
        .fetch_all(&self.pool)
        .await?;

        // One of the two is always empty
        let mut points: Vec<MeasurementPoint> = sector_rows.into_iter().map(Into::into).collect();
        points.extend(pivot_rows.into_iter().map(MeasurementPoint::from));
        Ok(points)
    }

    async fn list_comments(&self, evaluation_id: Uuid) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, evaluation_id, text, created_at
            FROM evaluation_comments
            WHERE evaluation_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(evaluation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn insert_unit(&mut self, unit: &NewIrrigationUnit) -> StoreResult<IrrigationUnit> {
        let unit_type = unit.details.unit_type();
        let details_json = unit_details_json(&unit.details)?;

        let query = format!(
            r#"
            INSERT INTO {} (property_id, identification, area_ha, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, property_id, identification, area_ha, details, created_at
            "#,
            unit_table(unit_type)
        );
        let row = sqlx::query_as::<_, UnitRow>(&query)
            .bind(unit.property_id)
            .bind(&unit.identification)
            .bind(unit.area_ha)
            .bind(&details_json)
            .fetch_one(&mut *self.tx)
            .await?;

        row.into_unit(unit_type)
    }

    async fn update_unit(&mut self, unit: &IrrigationUnit) -> StoreResult<IrrigationUnit> {
        let unit_type = unit.unit_type();
        let details_json = unit_details_json(&unit.details)?;

        let query = format!(
            r#"
            UPDATE {}
            SET identification = $2, area_ha = $3, details = $4
            WHERE id = $1
            RETURNING id, property_id, identification, area_ha, details, created_at
            "#,
            unit_table(unit_type)
        );
        let row = sqlx::query_as::<_, UnitRow>(&query)
            .bind(unit.id)
            .bind(&unit.identification)
            .bind(unit.area_ha)
            .bind(&details_json)
            .fetch_one(&mut *self.tx)
            .await?;

        row.into_unit(unit_type)
    }

    async fn count_unit_evaluations(&mut self, unit: UnitRef) -> StoreResult<i64> {
        // Evaluation inserts hold a key-share lock on the unit row
        let lock = format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            unit_table(unit.unit_type())
        );
        sqlx::query(&lock)
            .bind(unit.id())
            .execute(&mut *self.tx)
            .await?;

        let query = format!(
            "SELECT COUNT(*) FROM evaluations WHERE {} = $1",
            evaluation_unit_column(unit.unit_type())
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(unit.id())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn delete_unit(&mut self, unit: UnitRef) -> StoreResult<u64> {
        let query = format!("DELETE FROM {} WHERE id = $1", unit_table(unit.unit_type()));
        let result = sqlx::query(&query)
            .bind(unit.id())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_evaluation(&mut self, evaluation: &NewEvaluation) -> StoreResult<Evaluation> {
        let (sector_id, pivot_id) = match evaluation.unit {
            UnitRef::HydraulicSector(id) => (Some(id), None),
            UnitRef::CentralPivot(id) => (None, Some(id)),
        };

        let (id, recorded_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO evaluations (
                unit_type, hydraulic_sector_id, central_pivot_id,
                irrigated_area, water_volume, irrigation_duration,
                cuc, cud, cue, offline, evaluator_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, recorded_at
            "#,
        )
        .bind(evaluation.unit.unit_type().as_str())
        .bind(sector_id)
        .bind(pivot_id)
        .bind(evaluation.irrigated_area)
        .bind(evaluation.water_volume)
        .bind(evaluation.irrigation_duration)
        .bind(evaluation.coefficients.cuc)
        .bind(evaluation.coefficients.cud)
        .bind(evaluation.coefficients.cue)
        .bind(evaluation.offline)
        .bind(evaluation.evaluator_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(evaluation.clone().into_evaluation(id, recorded_at))
    }

    async fn insert_points(
        &mut self,
        evaluation_id: Uuid,
        points: &[MeasurementPoint],
    ) -> StoreResult<u64> {
        let mut inserted = 0;
        for point in points {
            match &point.position {
                PointPosition::Sector { x, y } => {
                    sqlx::query(
                        r#"
                        INSERT INTO sector_points (
                            evaluation_id, sequence, x, y, volume_ml, duration_s, flow_rate_l_h
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(evaluation_id)
                    .bind(point.sequence)
                    .bind(x)
                    .bind(y)
                    .bind(point.volume_ml)
                    .bind(point.duration_s)
                    .bind(point.flow_rate_l_h)
                    .execute(&mut *self.tx)
                    .await?;
                }
                PointPosition::Pivot {
                    distance_m,
                    collector_diameter_mm,
                } => {
                    sqlx::query(
                        r#"
                        INSERT INTO pivot_points (
                            evaluation_id, sequence, distance_m, collector_diameter_mm,
                            volume_ml, duration_s, flow_rate_l_h
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(evaluation_id)
                    .bind(point.sequence)
                    .bind(distance_m)
                    .bind(collector_diameter_mm)
                    .bind(point.volume_ml)
                    .bind(point.duration_s)
                    .bind(point.flow_rate_l_h)
                    .execute(&mut *self.tx)
                    .await?;
                }
            }
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn insert_comment(&mut self, evaluation_id: Uuid, text: &str) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO evaluation_comments (evaluation_id, text)
            VALUES ($1, $2)
            RETURNING id, evaluation_id, text, created_at
            "#,
        )
        .bind(evaluation_id)
        .bind(text)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn delete_comment_photos(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM comment_photos
            WHERE comment_id IN (SELECT id FROM evaluation_comments WHERE evaluation_id = $1)
            "#,
        )
        .bind(evaluation_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_comments(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM evaluation_comments WHERE evaluation_id = $1")
            .bind(evaluation_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_sector_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sector_points WHERE evaluation_id = $1")
            .bind(evaluation_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_pivot_points(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM pivot_points WHERE evaluation_id = $1")
            .bind(evaluation_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_evaluation(&mut self, evaluation_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM evaluations WHERE id = $1")
            .bind(evaluation_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
