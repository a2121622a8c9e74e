//! Validation utilities for field evaluations and irrigation units

use crate::models::{PivotDetails, SectorDetails, UnitType};

// ============================================================================
// Measurement Validations
// ============================================================================

/// Validate a collector reading before its flow rate is derived
///
/// A zero collection time passes here; it only fails when a flow rate
/// has to be derived from it.
pub fn validate_collection(volume_ml: f64, duration_s: f64) -> Result<(), &'static str> {
    if !volume_ml.is_finite() || !duration_s.is_finite() {
        return Err("Volume and collection time must be numbers");
    }
    if volume_ml < 0.0 {
        return Err("Collected volume cannot be negative");
    }
    if duration_s < 0.0 {
        return Err("Collection time cannot be negative");
    }
    Ok(())
}

/// Validate the collector diameter of a pivot reading (mm)
pub fn validate_collector_diameter(diameter_mm: f64) -> Result<(), &'static str> {
    if !diameter_mm.is_finite() || diameter_mm <= 0.0 {
        return Err("Collector diameter must be positive");
    }
    Ok(())
}

/// Check if a flow rate can take part in the coefficient calculation
pub fn is_usable_flow_rate(flow_rate_l_h: f64) -> bool {
    flow_rate_l_h.is_finite() && flow_rate_l_h > 0.0
}

// ============================================================================
// Irrigation Unit Validations
// ============================================================================

/// Exactly one unit description must be supplied when creating an area
pub fn validate_unit_choice(has_sector: bool, has_pivot: bool) -> Result<UnitType, &'static str> {
    match (has_sector, has_pivot) {
        (true, false) => Ok(UnitType::HydraulicSector),
        (false, true) => Ok(UnitType::CentralPivot),
        (true, true) => Err("Provide either a hydraulic sector or a central pivot, not both"),
        (false, false) => Err("A hydraulic sector or a central pivot is required"),
    }
}

/// Validate unit identification (1-100 characters)
pub fn validate_identification(identification: &str) -> Result<(), &'static str> {
    let trimmed = identification.trim();
    if trimmed.is_empty() {
        return Err("Identification is required");
    }
    if trimmed.chars().count() > 100 {
        return Err("Identification must be at most 100 characters");
    }
    Ok(())
}

/// Validate unit area (ha)
pub fn validate_area_ha(area_ha: f64) -> Result<(), &'static str> {
    if !area_ha.is_finite() || area_ha <= 0.0 {
        return Err("Area must be positive");
    }
    Ok(())
}

pub fn validate_sector_details(details: &SectorDetails) -> Result<(), &'static str> {
    if details.nominal_flow_rate_l_h <= 0.0 {
        return Err("Nominal flow rate must be positive");
    }
    if details.operating_pressure_kpa < 0.0 {
        return Err("Operating pressure cannot be negative");
    }
    if details.emitter_spacing_m <= 0.0 || details.lateral_spacing_m <= 0.0 {
        return Err("Emitter and lateral spacing must be positive");
    }
    Ok(())
}

pub fn validate_pivot_details(details: &PivotDetails) -> Result<(), &'static str> {
    if details.tower_count < 1 {
        return Err("A pivot has at least one tower");
    }
    if details.length_m <= 0.0 {
        return Err("Pivot length must be positive");
    }
    if details.operating_flow_rate_m3_h <= 0.0 {
        return Err("Operating flow rate must be positive");
    }
    if details.nozzle_pressure_kpa < 0.0 {
        return Err("Nozzle pressure cannot be negative");
    }
    if !(0.0..=100.0).contains(&details.speed_percent) {
        return Err("Speed must be between 0 and 100%");
    }
    Ok(())
}
