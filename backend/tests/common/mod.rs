//! Fixtures shared by the service tests

#![allow(dead_code)]

use irrigation_uniformity_backend::services::area::{AreaService, CreateAreaInput};
use irrigation_uniformity_backend::services::evaluation::{
    CreateEvaluationInput, MeasurementInput,
};
use irrigation_uniformity_backend::store::InMemoryStore;
use shared::{EmitterType, IrrigationUnit, PivotDetails, Property, SectorDetails, UnitRef};
use uuid::Uuid;

pub struct Farm {
    pub store: InMemoryStore,
    pub owner_id: Uuid,
    pub property: Property,
}

/// Empty store holding one property
pub async fn farm() -> Farm {
    let store = InMemoryStore::new();
    let owner_id = Uuid::new_v4();
    let property = Property {
        id: Uuid::new_v4(),
        name: "Fazenda Boa Vista".to_string(),
        owner_id,
        municipality: Some("Lavras".to_string()),
        state: Some("MG".to_string()),
    };
    store.insert_property(property.clone()).await;

    Farm {
        store,
        owner_id,
        property,
    }
}

pub fn sector_details() -> SectorDetails {
    SectorDetails {
        manufacturer: Some("Netafim".to_string()),
        model: None,
        nominal_flow_rate_l_h: 2.0,
        operating_pressure_kpa: 150.0,
        emitter_spacing_m: 0.5,
        lateral_spacing_m: 3.5,
        filter_type: Some("disc".to_string()),
        emitter_type: EmitterType::Dripper,
    }
}

pub fn pivot_details() -> PivotDetails {
    PivotDetails {
        tower_count: 6,
        length_m: 350.0,
        manufacturer: Some("Valley".to_string()),
        model: None,
        operating_flow_rate_m3_h: 180.0,
        nozzle_pressure_kpa: 200.0,
        speed_percent: 50.0,
        emitter_type: EmitterType::Spray,
        fertigation: false,
    }
}

pub fn sector_input(property_id: Uuid, identification: &str) -> CreateAreaInput {
    CreateAreaInput {
        property_id,
        identification: identification.to_string(),
        area_ha: 4.5,
        hydraulic_sector: Some(sector_details()),
        central_pivot: None,
    }
}

pub fn pivot_input(property_id: Uuid, identification: &str) -> CreateAreaInput {
    CreateAreaInput {
        property_id,
        identification: identification.to_string(),
        area_ha: 38.0,
        hydraulic_sector: None,
        central_pivot: Some(pivot_details()),
    }
}

impl Farm {
    pub async fn add_sector(&self, identification: &str) -> IrrigationUnit {
        AreaService::new(self.store.clone())
            .create_area(self.owner_id, sector_input(self.property.id, identification))
            .await
            .unwrap()
    }

    pub async fn add_pivot(&self, identification: &str) -> IrrigationUnit {
        AreaService::new(self.store.clone())
            .create_area(self.owner_id, pivot_input(self.property.id, identification))
            .await
            .unwrap()
    }
}

/// Sector reading with a supplied flow rate
pub fn sector_point(sequence: i32, flow_rate_l_h: f64) -> MeasurementInput {
    MeasurementInput {
        sequence: Some(sequence),
        x: Some(sequence as f64),
        y: Some(1.0),
        volume_ml: flow_rate_l_h.max(0.0) * 1000.0 / 12.0,
        duration_s: 300.0,
        flow_rate_l_h: Some(flow_rate_l_h),
        ..Default::default()
    }
}

/// Pivot reading whose flow rate is derived from volume and time
pub fn pivot_point(sequence: i32, volume_ml: f64, duration_s: f64) -> MeasurementInput {
    MeasurementInput {
        sequence: Some(sequence),
        distance_m: Some(sequence as f64 * 5.0),
        collector_diameter_mm: Some(80.0),
        volume_ml,
        duration_s,
        ..Default::default()
    }
}

pub fn evaluation_input(unit: UnitRef, points: Vec<MeasurementInput>) -> CreateEvaluationInput {
    CreateEvaluationInput {
        unit,
        irrigated_area: 4.5,
        water_volume: 120.0,
        irrigation_duration: 2.0,
        offline: false,
        points,
        comment: None,
        recommendations: None,
    }
}
