//! Field evaluation models: evaluations, measurement points and comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::uniformity::UniformityCoefficients;
use crate::types::MediaReference;

/// Marker that distinguishes the recommendations comment from free-text comments
pub const RECOMMENDATIONS_PREFIX: &str = "[RECOMMENDATIONS] ";

/// Kind of irrigation unit an evaluation was made on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    HydraulicSector,
    CentralPivot,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::HydraulicSector => "hydraulic_sector",
            UnitType::CentralPivot => "central_pivot",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitType::HydraulicSector => "hydraulic sector",
            UnitType::CentralPivot => "central pivot",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hydraulic_sector" => Ok(UnitType::HydraulicSector),
            "central_pivot" => Ok(UnitType::CentralPivot),
            other => Err(format!("Unknown unit type: {}", other)),
        }
    }
}

/// Reference to exactly one irrigation unit
///
/// Serialized as `{"unit_type": "central_pivot", "id": "..."}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "unit_type", content = "id", rename_all = "snake_case")]
pub enum UnitRef {
    HydraulicSector(Uuid),
    CentralPivot(Uuid),
}

impl UnitRef {
    pub fn new(unit_type: UnitType, id: Uuid) -> Self {
        match unit_type {
            UnitType::HydraulicSector => UnitRef::HydraulicSector(id),
            UnitType::CentralPivot => UnitRef::CentralPivot(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            UnitRef::HydraulicSector(id) | UnitRef::CentralPivot(id) => *id,
        }
    }

    pub fn unit_type(&self) -> UnitType {
        match self {
            UnitRef::HydraulicSector(_) => UnitType::HydraulicSector,
            UnitRef::CentralPivot(_) => UnitType::CentralPivot,
        }
    }
}

/// Where a collector sat during the evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum PointPosition {
    /// Emitter grid coordinate inside a hydraulic sector
    Sector { x: Option<f64>, y: Option<f64> },
    /// Position along the pivot radius
    Pivot {
        distance_m: Option<f64>,
        collector_diameter_mm: f64,
    },
}

impl PointPosition {
    pub fn unit_type(&self) -> UnitType {
        match self {
            PointPosition::Sector { .. } => UnitType::HydraulicSector,
            PointPosition::Pivot { .. } => UnitType::CentralPivot,
        }
    }
}

/// One collector reading. The flow rate is always present once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementPoint {
    pub sequence: i32,
    pub position: PointPosition,
    pub volume_ml: f64,
    pub duration_s: f64,
    pub flow_rate_l_h: f64,
}

impl MeasurementPoint {
    pub fn unit_type(&self) -> UnitType {
        self.position.unit_type()
    }

    /// Flow rates that take part in the coefficient calculation
    pub fn is_usable(&self) -> bool {
        crate::validation::is_usable_flow_rate(self.flow_rate_l_h)
    }
}

/// A recorded field evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub unit: UnitRef,
    /// Irrigated area (ha)
    pub irrigated_area: f64,
    /// Water volume applied (m³)
    pub water_volume: f64,
    /// Irrigation duration (h)
    pub irrigation_duration: f64,
    pub coefficients: UniformityCoefficients,
    /// Captured on a device without connectivity and synced later
    pub offline: bool,
    pub evaluator_id: Uuid,
}

/// Free-text annotation on an evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub evaluation_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_recommendation(&self) -> bool {
        self.text.starts_with(RECOMMENDATIONS_PREFIX)
    }

    /// Text without the recommendations marker
    pub fn body(&self) -> &str {
        self.text
            .strip_prefix(RECOMMENDATIONS_PREFIX)
            .unwrap_or(&self.text)
    }
}

/// Photo attached to a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPhoto {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub media: MediaReference,
}

/// Store the recommendations text the way it is told apart on read
pub fn recommendations_comment(text: &str) -> String {
    format!("{}{}", RECOMMENDATIONS_PREFIX, text)
}

/// Free-text comment with any leading recommendations marker removed
pub fn free_text_comment(text: &str) -> &str {
    let mut text = text.trim();
    while let Some(rest) = text.strip_prefix(RECOMMENDATIONS_PREFIX) {
        text = rest.trim_start();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_ref_is_tagged_by_unit_type() {
        let id = Uuid::nil();
        let json = serde_json::to_value(UnitRef::CentralPivot(id)).unwrap();
        assert_eq!(json["unit_type"], "central_pivot");
        assert_eq!(json["id"], id.to_string());

        let parsed: UnitRef = serde_json::from_value(serde_json::json!({
            "unit_type": "hydraulic_sector",
            "id": id,
        }))
        .unwrap();
        assert_eq!(parsed, UnitRef::HydraulicSector(id));
    }

    #[test]
    fn unknown_unit_type_is_rejected() {
        let parsed = serde_json::from_value::<UnitRef>(serde_json::json!({
            "unit_type": "drip_line",
            "id": Uuid::nil(),
        }));
        assert!(parsed.is_err());
        assert!("drip_line".parse::<UnitType>().is_err());
    }

    #[test]
    fn recommendations_are_told_apart_from_comments() {
        let comment = Comment {
            id: Uuid::nil(),
            evaluation_id: Uuid::nil(),
            text: recommendations_comment("Trocar emissores"),
            created_at: Utc::now(),
        };
        assert!(comment.is_recommendation());
        assert_eq!(comment.body(), "Trocar emissores");
    }

    #[test]
    fn free_text_comment_drops_the_marker() {
        assert_eq!(free_text_comment("  Vento forte "), "Vento forte");
        assert_eq!(
            free_text_comment("[RECOMMENDATIONS] [RECOMMENDATIONS]  Limpar filtros"),
            "Limpar filtros"
        );
        assert_eq!(free_text_comment("[RECOMMENDATIONS] "), "[RECOMMENDATIONS]");
    }

    #[test]
    fn point_position_matches_unit_type() {
        let point = MeasurementPoint {
            sequence: 1,
            position: PointPosition::Pivot {
                distance_m: Some(5.0),
                collector_diameter_mm: 80.0,
            },
            volume_ml: 100.0,
            duration_s: 60.0,
            flow_rate_l_h: 6.0,
        };
        assert_eq!(point.unit_type(), UnitType::CentralPivot);
        assert!(point.is_usable());
    }
}
