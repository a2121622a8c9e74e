//! WebAssembly module for the Irrigation Uniformity Platform
//!
//! Lets the offline field client preview results before syncing:
//! - Flow-rate derivation from collector readings
//! - CUC / CUD / CUE calculation
//! - Quality band classification

use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

#[derive(Serialize)]
struct UniformityPreview {
    coefficients: UniformityCoefficients,
    classification: ClassifiedCoefficients,
    usable_points: usize,
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Flow rate (L/h) of one collector reading
#[wasm_bindgen]
pub fn calculate_flow_rate(volume_ml: f64, duration_s: f64) -> Result<f64, JsValue> {
    derive_flow_rate(volume_ml, duration_s).map_err(to_js_error)
}

/// Strict coefficient calculation over all given flow rates, as JSON
#[wasm_bindgen]
pub fn calculate_coefficients(flow_rates: &[f64]) -> Result<String, JsValue> {
    let coefficients = compute_coefficients(flow_rates).map_err(to_js_error)?;
    let preview = UniformityPreview {
        classification: coefficients.classify(),
        coefficients,
        usable_points: flow_rates.len(),
    };
    serde_json::to_string(&preview).map_err(to_js_error)
}

/// Coefficients the server will store for these readings, as JSON
///
/// Only strictly positive flow rates count; with none left the result is
/// all zeros.
#[wasm_bindgen]
pub fn preview_evaluation(flow_rates: &[f64]) -> Result<String, JsValue> {
    let usable: Vec<f64> = flow_rates
        .iter()
        .copied()
        .filter(|q| is_usable_flow_rate(*q))
        .collect();

    let coefficients = if usable.is_empty() {
        #[cfg(target_arch = "wasm32")]
        web_sys::console::warn_1(&JsValue::from_str(
            "No usable flow rate; coefficients default to zero",
        ));
        UniformityCoefficients::ZERO
    } else {
        compute_coefficients(&usable).map_err(to_js_error)?
    };

    let preview = UniformityPreview {
        classification: coefficients.classify(),
        coefficients,
        usable_points: usable.len(),
    };
    serde_json::to_string(&preview).map_err(to_js_error)
}

/// Classify one coefficient value (`kind` is cuc, cud or cue), as JSON
#[wasm_bindgen]
pub fn classify_coefficient(kind: &str, value: f64) -> Result<String, JsValue> {
    let kind: CoefficientKind = kind.parse().map_err(to_js_error)?;
    serde_json::to_string(&classify(kind, value)).map_err(to_js_error)
}

/// Classify a stored coefficient triple into a plain JS object
#[wasm_bindgen]
pub fn classify_evaluation(cuc: f64, cud: f64, cue: f64) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(&UniformityCoefficients { cuc, cud, cue }.classify())
        .map_err(to_js_error)?;
    js_sys::JSON::parse(&json)
}

/// Check a reading before it is queued for sync
#[wasm_bindgen]
pub fn validate_reading(volume_ml: f64, duration_s: f64) -> Option<String> {
    validate_collection(volume_ml, duration_s)
        .err()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_rate() {
        assert_eq!(calculate_flow_rate(1000.0, 3600.0).unwrap(), 1.0);
        assert_eq!(calculate_flow_rate(250.0, 300.0).unwrap(), 3.0);
    }

    #[test]
    fn test_coefficients_json() {
        let json = calculate_coefficients(&[8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["coefficients"]["cuc"], 88.0);
        assert_eq!(value["classification"]["cuc"]["class"], "GOOD");
        assert_eq!(value["usable_points"], 5);
    }

    #[test]
    fn test_preview_ignores_unusable_rates() {
        let json = preview_evaluation(&[8.0, 0.0, 9.0, 10.0, -2.0, 11.0, 12.0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["coefficients"]["cuc"], 88.0);
        assert_eq!(value["usable_points"], 5);
    }

    #[test]
    fn test_classify_coefficient() {
        let json = classify_coefficient("CUD", 72.0).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["class"], "REGULAR");
    }

    #[test]
    fn test_validate_reading() {
        assert!(validate_reading(250.0, 300.0).is_none());
        assert!(validate_reading(-1.0, 300.0).is_some());
    }
}
