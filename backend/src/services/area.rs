//! Area service for the irrigation units (hydraulic sectors and central
//! pivots) of a property

use serde::{Deserialize, Serialize};
use shared::{
    validate_area_ha, validate_identification, validate_pivot_details, validate_sector_details,
    validate_unit_choice, IrrigationUnit, PivotDetails, Property, SectorDetails, UnitDetails,
    UnitRef, UnitType,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::evaluation::EvaluationSummary;
use crate::services::require_unit_owner;
use crate::store::{NewIrrigationUnit, StoreTransaction, UniformityStore};

/// Number of evaluations shown per unit in the property overview
pub const DEFAULT_RECENT_EVALUATIONS: i64 = 5;

/// Area service generic over the backing store
#[derive(Clone)]
pub struct AreaService<S> {
    store: S,
    recent_limit: i64,
}

/// Input for creating an area. Exactly one of the unit descriptions is set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAreaInput {
    pub property_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub identification: String,
    pub area_ha: f64,
    pub hydraulic_sector: Option<SectorDetails>,
    pub central_pivot: Option<PivotDetails>,
}

/// Partial update of an area. Details, when given, replace the stored ones
/// and must match the unit type.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAreaInput {
    #[validate(length(min = 1, max = 100))]
    pub identification: Option<String>,
    pub area_ha: Option<f64>,
    pub hydraulic_sector: Option<SectorDetails>,
    pub central_pivot: Option<PivotDetails>,
}

/// Units on every property of one owner
#[derive(Debug, Clone, Serialize)]
pub struct OwnedAreas {
    pub hydraulic_sectors: Vec<IrrigationUnit>,
    pub central_pivots: Vec<IrrigationUnit>,
}

/// One unit in the property overview
#[derive(Debug, Clone, Serialize)]
pub struct AreaSummary {
    #[serde(flatten)]
    pub unit: IrrigationUnit,
    pub recent_evaluations: Vec<EvaluationSummary>,
    pub evaluation_count: i64,
    pub point_count: i64,
}

/// All units of a property
#[derive(Debug, Clone, Serialize)]
pub struct AreaOverview {
    pub property: Property,
    pub hydraulic_sectors: Vec<AreaSummary>,
    pub central_pivots: Vec<AreaSummary>,
    pub total_areas: usize,
    pub total_evaluations: i64,
}

/// One unit with its full evaluation history
#[derive(Debug, Clone, Serialize)]
pub struct AreaDetail {
    pub unit: IrrigationUnit,
    pub evaluations: Vec<EvaluationSummary>,
}

impl<S: UniformityStore> AreaService<S> {
    /// Create a new AreaService instance
    pub fn new(store: S) -> Self {
        Self {
            store,
            recent_limit: DEFAULT_RECENT_EVALUATIONS,
        }
    }

    pub fn with_recent_limit(mut self, recent_limit: i64) -> Self {
        self.recent_limit = recent_limit.max(0);
        self
    }

    /// Create a hydraulic sector or a central pivot on a property
    pub async fn create_area(
        &self,
        requester_id: Uuid,
        input: CreateAreaInput,
    ) -> AppResult<IrrigationUnit> {
        input.validate()?;

        check_identification(&input.identification)?;
        check_area_ha(input.area_ha)?;

        let unit_type =
            validate_unit_choice(input.hydraulic_sector.is_some(), input.central_pivot.is_some())
                .map_err(|msg| {
                    AppError::invalid(
                        "hydraulic_sector/central_pivot",
                        msg,
                        "Informe um setor hidráulico ou um pivô central, apenas um deles",
                    )
                })?;

        let details = match (unit_type, input.hydraulic_sector, input.central_pivot) {
            (UnitType::HydraulicSector, Some(sector), _) => checked_sector(sector)?,
            (UnitType::CentralPivot, _, Some(pivot)) => checked_pivot(pivot)?,
            _ => {
                return Err(AppError::Internal(
                    "unit choice does not match the supplied details".to_string(),
                ))
            }
        };

        let property = self
            .store
            .find_property(input.property_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Property".to_string()))?;

        if property.owner_id != requester_id {
            return Err(AppError::Forbidden(format!(
                "Only the owner of property {} can add areas to it",
                property.id
            )));
        }

        let mut tx = self.store.begin().await?;
        let unit = tx
            .insert_unit(&NewIrrigationUnit {
                property_id: property.id,
                identification: input.identification.trim().to_string(),
                area_ha: input.area_ha,
                details,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            unit_id = %unit.id,
            unit_type = %unit.unit_type(),
            property_id = %property.id,
            "Area created"
        );

        Ok(unit)
    }

    /// Change the identification, area or details of a unit
    pub async fn update_area(
        &self,
        requester_id: Uuid,
        unit_ref: UnitRef,
        input: UpdateAreaInput,
    ) -> AppResult<IrrigationUnit> {
        input.validate()?;
        if let Some(identification) = &input.identification {
            check_identification(identification)?;
        }
        if let Some(area_ha) = input.area_ha {
            check_area_ha(area_ha)?;
        }

        let label = unit_ref.unit_type().label();
        let mut unit = self
            .store
            .find_unit(unit_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(capitalize(label)))?;

        require_unit_owner(&self.store, &unit, requester_id).await?;

        unit.details = match (unit.details, input.hydraulic_sector, input.central_pivot) {
            (details, None, None) => details,
            (UnitDetails::HydraulicSector(_), Some(sector), None) => checked_sector(sector)?,
            (UnitDetails::CentralPivot(_), None, Some(pivot)) => checked_pivot(pivot)?,
            _ => {
                return Err(AppError::invalid(
                    "hydraulic_sector/central_pivot",
                    format!("Only {} details can be set on a {}", label, label),
                    "Os dados informados não correspondem ao tipo da unidade",
                ))
            }
        };
        if let Some(identification) = input.identification {
            unit.identification = identification.trim().to_string();
        }
        if let Some(area_ha) = input.area_ha {
            unit.area_ha = area_ha;
        }

        let mut tx = self.store.begin().await?;
        let updated = tx.update_unit(&unit).await?;
        tx.commit().await?;

        tracing::info!(unit_id = %updated.id, unit_type = %updated.unit_type(), "Area updated");

        Ok(updated)
    }

    /// Sectors and pivots on every property owned by `owner_id`
    pub async fn list_owned_areas(&self, owner_id: Uuid) -> AppResult<OwnedAreas> {
        let hydraulic_sectors = self
            .store
            .list_owned_units(owner_id, UnitType::HydraulicSector)
            .await?;
        let central_pivots = self
            .store
            .list_owned_units(owner_id, UnitType::CentralPivot)
            .await?;

        Ok(OwnedAreas {
            hydraulic_sectors,
            central_pivots,
        })
    }

    /// List the sectors and pivots of a property with their latest evaluations
    pub async fn list_areas(&self, property_id: Uuid) -> AppResult<AreaOverview> {
        let property = self
            .store
            .find_property(property_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Property".to_string()))?;

        let hydraulic_sectors = self
            .summarize(property_id, UnitType::HydraulicSector)
            .await?;
        let central_pivots = self.summarize(property_id, UnitType::CentralPivot).await?;

        let total_evaluations = hydraulic_sectors
            .iter()
            .chain(central_pivots.iter())
            .map(|a| a.evaluation_count)
            .sum();

        Ok(AreaOverview {
            property,
            total_areas: hydraulic_sectors.len() + central_pivots.len(),
            total_evaluations,
            hydraulic_sectors,
            central_pivots,
        })
    }

    async fn summarize(&self, property_id: Uuid, unit_type: UnitType) -> AppResult<Vec<AreaSummary>> {
        let units = self.store.list_units(property_id, unit_type).await?;

        let mut summaries = Vec::with_capacity(units.len());
        for unit in units {
            let unit_ref = unit.unit_ref();
            let recent = self
                .store
                .list_evaluations(unit_ref, Some(self.recent_limit))
                .await?;
            let evaluation_count = self.store.count_evaluations(unit_ref).await?;
            let point_count = self.store.count_points(unit_ref).await?;

            summaries.push(AreaSummary {
                unit,
                recent_evaluations: recent.into_iter().map(EvaluationSummary::from).collect(),
                evaluation_count,
                point_count,
            });
        }

        Ok(summaries)
    }

    /// Find a unit by id, hydraulic sectors first
    pub async fn find_area(&self, unit_id: Uuid) -> AppResult<AreaDetail> {
        let mut found = None;
        for unit_ref in [
            UnitRef::HydraulicSector(unit_id),
            UnitRef::CentralPivot(unit_id),
        ] {
            if let Some(unit) = self.store.find_unit(unit_ref).await? {
                found = Some(unit);
                break;
            }
        }
        let unit = found.ok_or_else(|| AppError::NotFound("Irrigation unit".to_string()))?;

        let evaluations = self.store.list_evaluations(unit.unit_ref(), None).await?;

        Ok(AreaDetail {
            unit,
            evaluations: evaluations.into_iter().map(EvaluationSummary::from).collect(),
        })
    }

    /// Delete a unit. Blocked while evaluations reference it.
    pub async fn delete_area(&self, requester_id: Uuid, unit_ref: UnitRef) -> AppResult<()> {
        let label = unit_ref.unit_type().label();

        let unit = self
            .store
            .find_unit(unit_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(capitalize(label)))?;

        require_unit_owner(&self.store, &unit, requester_id).await?;

        let mut tx = self.store.begin().await?;
        let evaluation_count = tx.count_unit_evaluations(unit_ref).await?;
        if evaluation_count > 0 {
            return Err(AppError::Conflict {
                resource: unit_ref.unit_type().to_string(),
                message: format!(
                    "Cannot delete {}: {} evaluations are linked to it",
                    label, evaluation_count
                ),
                message_pt: format!(
                    "Não é possível excluir: {} avaliações estão vinculadas",
                    evaluation_count
                ),
            });
        }

        tx.delete_unit(unit_ref).await?;
        tx.commit().await?;

        tracing::info!(unit_id = %unit.id, unit_type = %unit.unit_type(), "Area deleted");

        Ok(())
    }
}

fn check_identification(identification: &str) -> AppResult<()> {
    validate_identification(identification)
        .map_err(|msg| AppError::invalid("identification", msg, "Identificação inválida"))
}

fn check_area_ha(area_ha: f64) -> AppResult<()> {
    validate_area_ha(area_ha)
        .map_err(|msg| AppError::invalid("area_ha", msg, "A área deve ser positiva"))
}

fn checked_sector(sector: SectorDetails) -> AppResult<UnitDetails> {
    validate_sector_details(&sector).map_err(|msg| {
        AppError::invalid("hydraulic_sector", msg, "Dados do setor hidráulico inválidos")
    })?;
    Ok(UnitDetails::HydraulicSector(sector))
}

fn checked_pivot(pivot: PivotDetails) -> AppResult<UnitDetails> {
    validate_pivot_details(&pivot)
        .map_err(|msg| AppError::invalid("central_pivot", msg, "Dados do pivô central inválidos"))?;
    Ok(UnitDetails::CentralPivot(pivot))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
