//! Business logic services for the Irrigation Uniformity Platform

pub mod area;
pub mod evaluation;
pub mod recorder;

pub use area::AreaService;
pub use evaluation::EvaluationService;
pub use recorder::EvaluationRecorder;

use shared::{IrrigationUnit, Property};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::UniformityStore;

/// Load the property that owns `unit` and check the requester owns it
pub(crate) async fn require_unit_owner<S: UniformityStore>(
    store: &S,
    unit: &IrrigationUnit,
    requester_id: Uuid,
) -> AppResult<Property> {
    let property = store
        .find_property(unit.property_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Property".to_string()))?;

    if property.owner_id != requester_id {
        return Err(AppError::Forbidden(format!(
            "Only the owner of property {} can change its {}s",
            property.id,
            unit.unit_type().label()
        )));
    }

    Ok(property)
}
