//! Properties and the irrigation units installed on them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluation::{UnitRef, UnitType};

/// Farm property. Owned by the user allowed to change its units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub municipality: Option<String>,
    pub state: Option<String>,
}

/// Emitter installed on the unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmitterType {
    Dripper,
    MicroSprinkler,
    Sprinkler,
    Spray,
}

/// Drip / micro-sprinkler sector description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorDetails {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub nominal_flow_rate_l_h: f64,
    pub operating_pressure_kpa: f64,
    pub emitter_spacing_m: f64,
    pub lateral_spacing_m: f64,
    pub filter_type: Option<String>,
    pub emitter_type: EmitterType,
}

/// Center pivot description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PivotDetails {
    pub tower_count: i32,
    pub length_m: f64,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub operating_flow_rate_m3_h: f64,
    pub nozzle_pressure_kpa: f64,
    /// Percent timer setting of the last tower
    pub speed_percent: f64,
    pub emitter_type: EmitterType,
    #[serde(default)]
    pub fertigation: bool,
}

/// Unit-specific description, tagged by unit type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "unit_type", rename_all = "snake_case")]
pub enum UnitDetails {
    HydraulicSector(SectorDetails),
    CentralPivot(PivotDetails),
}

impl UnitDetails {
    pub fn unit_type(&self) -> UnitType {
        match self {
            UnitDetails::HydraulicSector(_) => UnitType::HydraulicSector,
            UnitDetails::CentralPivot(_) => UnitType::CentralPivot,
        }
    }
}

/// An evaluated irrigation unit (hydraulic sector or central pivot)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationUnit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub identification: String,
    pub area_ha: f64,
    pub details: UnitDetails,
    pub created_at: DateTime<Utc>,
}

impl IrrigationUnit {
    pub fn unit_type(&self) -> UnitType {
        self.details.unit_type()
    }

    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::new(self.unit_type(), self.id)
    }
}
