//! Uniformity coefficients and their quality bands
//!
//! Coefficients follow the usual field-evaluation formulas:
//! - CUC (Christiansen): `[1 - Σ|qi - qm| / (n × qm)] × 100`
//! - CUD (distribution): `(q25 / qm) × 100`, q25 = mean of the lowest quarter
//! - CUE (statistical): `[1 - (S / qm)] × 100`, S = population std deviation
//!
//! Quality bands: CUC after Mantovani (2002), CUD after Bralts (1986),
//! CUE after Bralts and Kesner (1983).

use serde::{Deserialize, Serialize};

use crate::error::UniformityError;

/// Round to two decimal places, the precision every coefficient is reported with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Flow rate in L/h from a collected volume (mL) over a collection time (s)
///
/// `Q = (volume / 1000) / (time / 3600)`
pub fn derive_flow_rate(volume_ml: f64, duration_s: f64) -> Result<f64, UniformityError> {
    if duration_s == 0.0 {
        return Err(UniformityError::InvalidMeasurement(
            "collection time cannot be zero".to_string(),
        ));
    }
    if !volume_ml.is_finite() || !duration_s.is_finite() {
        return Err(UniformityError::InvalidMeasurement(
            "volume and collection time must be finite numbers".to_string(),
        ));
    }

    let volume_liters = volume_ml / 1000.0;
    let duration_hours = duration_s / 3600.0;

    let flow_rate = round2(volume_liters / duration_hours);
    if !flow_rate.is_finite() {
        return Err(UniformityError::InvalidMeasurement(
            "flow rate is out of range for the given volume and collection time".to_string(),
        ));
    }

    Ok(flow_rate)
}

/// The three coefficients of one evaluation, in percent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct UniformityCoefficients {
    pub cuc: f64,
    pub cud: f64,
    pub cue: f64,
}

impl UniformityCoefficients {
    /// Fallback stored when an evaluation has no usable flow rate
    pub const ZERO: Self = Self {
        cuc: 0.0,
        cud: 0.0,
        cue: 0.0,
    };

    pub fn get(&self, kind: CoefficientKind) -> f64 {
        match kind {
            CoefficientKind::Cuc => self.cuc,
            CoefficientKind::Cud => self.cud,
            CoefficientKind::Cue => self.cue,
        }
    }

    /// Classify all three values
    pub fn classify(&self) -> ClassifiedCoefficients {
        ClassifiedCoefficients {
            cuc: classify(CoefficientKind::Cuc, self.cuc),
            cud: classify(CoefficientKind::Cud, self.cud),
            cue: classify(CoefficientKind::Cue, self.cue),
        }
    }
}

/// Compute CUC, CUD and CUE over one set of flow rates (L/h)
pub fn compute_coefficients(flow_rates: &[f64]) -> Result<UniformityCoefficients, UniformityError> {
    if flow_rates.is_empty() {
        return Err(UniformityError::EmptyMeasurementSet);
    }
    if flow_rates.iter().any(|q| !q.is_finite()) {
        return Err(UniformityError::InvalidMeasurement(
            "flow rates must be finite numbers".to_string(),
        ));
    }

    let qm = mean(flow_rates);
    if !qm.is_finite() {
        return Err(out_of_range("mean flow rate"));
    }
    if qm == 0.0 {
        return Err(UniformityError::DivisionByZero);
    }

    let n = flow_rates.len() as f64;

    let deviation_sum: f64 = flow_rates.iter().map(|q| (q - qm).abs()).sum();
    let cuc = (1.0 - deviation_sum / (n * qm)) * 100.0;

    let mut sorted = flow_rates.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    // ceil(n / 4), never less than one value
    let quarter = ((flow_rates.len() + 3) / 4).max(1);
    let q25 = mean(&sorted[..quarter]);
    let cud = (q25 / qm) * 100.0;

    let variance = flow_rates.iter().map(|q| (q - qm).powi(2)).sum::<f64>() / n;
    let cue = (1.0 - variance.sqrt() / qm) * 100.0;

    let coefficients = UniformityCoefficients {
        cuc: round2(cuc),
        cud: round2(cud),
        cue: round2(cue),
    };
    for (name, value) in [
        ("CUC", coefficients.cuc),
        ("CUD", coefficients.cud),
        ("CUE", coefficients.cue),
    ] {
        if !value.is_finite() {
            return Err(out_of_range(name));
        }
    }

    Ok(coefficients)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn out_of_range(what: &str) -> UniformityError {
    UniformityError::InvalidMeasurement(format!("{} is out of range for these flow rates", what))
}

/// Which coefficient a value belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CoefficientKind {
    Cuc,
    Cud,
    Cue,
}

impl CoefficientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoefficientKind::Cuc => "cuc",
            CoefficientKind::Cud => "cud",
            CoefficientKind::Cue => "cue",
        }
    }
}

impl std::str::FromStr for CoefficientKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cuc" => Ok(CoefficientKind::Cuc),
            "cud" => Ok(CoefficientKind::Cud),
            "cue" => Ok(CoefficientKind::Cue),
            other => Err(format!("Unknown coefficient: {}", other)),
        }
    }
}

/// Quality band label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UniformityClass {
    #[serde(rename = "INACCEPTABLE")]
    Inacceptable,
    #[serde(rename = "POOR")]
    Poor,
    #[serde(rename = "REGULAR")]
    Regular,
    #[serde(rename = "REASONABLE")]
    Reasonable,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "VERY GOOD")]
    VeryGood,
    #[serde(rename = "EXCELLENT")]
    Excellent,
}

impl UniformityClass {
    pub fn label(&self) -> &'static str {
        match self {
            UniformityClass::Inacceptable => "INACCEPTABLE",
            UniformityClass::Poor => "POOR",
            UniformityClass::Regular => "REGULAR",
            UniformityClass::Reasonable => "REASONABLE",
            UniformityClass::Good => "GOOD",
            UniformityClass::VeryGood => "VERY GOOD",
            UniformityClass::Excellent => "EXCELLENT",
        }
    }
}

impl std::fmt::Display for UniformityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A coefficient value with its band, indicative color and description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UniformityClassification {
    pub value: f64,
    pub class: UniformityClass,
    pub color: String,
    pub description: String,
}

/// Classification of the three coefficients of one evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedCoefficients {
    pub cuc: UniformityClassification,
    pub cud: UniformityClassification,
    pub cue: UniformityClassification,
}

pub const COLOR_RED: &str = "#EF4444";
pub const COLOR_ORANGE: &str = "#F97316";
pub const COLOR_YELLOW: &str = "#EAB308";
pub const COLOR_BLUE: &str = "#3B82F6";
pub const COLOR_GREEN: &str = "#10B981";

struct Band {
    floor: f64,
    class: UniformityClass,
    color: &'static str,
    description: &'static str,
}

// Bands are ordered from the highest floor down; the last one is open below.
static CUC_BANDS: [Band; 5] = [
    Band {
        floor: 90.0,
        class: UniformityClass::Excellent,
        color: COLOR_GREEN,
        description: "Excellent uniformity.",
    },
    Band {
        floor: 80.0,
        class: UniformityClass::Good,
        color: COLOR_BLUE,
        description: "Good uniformity.",
    },
    Band {
        floor: 70.0,
        class: UniformityClass::Reasonable,
        color: COLOR_YELLOW,
        description: "Fair uniformity. There is room for improvement.",
    },
    Band {
        floor: 60.0,
        class: UniformityClass::Poor,
        color: COLOR_ORANGE,
        description: "Low uniformity. Maintenance required.",
    },
    Band {
        floor: f64::NEG_INFINITY,
        class: UniformityClass::Inacceptable,
        color: COLOR_RED,
        description: "Inadequate uniformity. Urgent correction required.",
    },
];

static CUD_BANDS: [Band; 4] = [
    Band {
        floor: 90.0,
        class: UniformityClass::Excellent,
        color: COLOR_GREEN,
        description: "Excellent water distribution.",
    },
    Band {
        floor: 80.0,
        class: UniformityClass::Good,
        color: COLOR_BLUE,
        description: "Good water distribution.",
    },
    Band {
        floor: 70.0,
        class: UniformityClass::Regular,
        color: COLOR_YELLOW,
        description: "Regular distribution. There is room for improvement.",
    },
    Band {
        floor: f64::NEG_INFINITY,
        class: UniformityClass::Poor,
        color: COLOR_RED,
        description: "Poor distribution. Correction required.",
    },
];

static CUE_BANDS: [Band; 5] = [
    Band {
        floor: 90.0,
        class: UniformityClass::Excellent,
        color: COLOR_GREEN,
        description: "Excellent statistical uniformity.",
    },
    Band {
        floor: 80.0,
        class: UniformityClass::VeryGood,
        color: COLOR_BLUE,
        description: "Very good statistical uniformity.",
    },
    Band {
        floor: 70.0,
        class: UniformityClass::Reasonable,
        color: COLOR_YELLOW,
        description: "Reasonable statistical uniformity.",
    },
    Band {
        floor: 60.0,
        class: UniformityClass::Poor,
        color: COLOR_ORANGE,
        description: "Poor statistical uniformity.",
    },
    Band {
        floor: f64::NEG_INFINITY,
        class: UniformityClass::Inacceptable,
        color: COLOR_RED,
        description: "Inadequate statistical uniformity.",
    },
];

fn bands(kind: CoefficientKind) -> &'static [Band] {
    match kind {
        CoefficientKind::Cuc => &CUC_BANDS,
        CoefficientKind::Cud => &CUD_BANDS,
        CoefficientKind::Cue => &CUE_BANDS,
    }
}

/// Map a coefficient value onto its quality band (lower bounds inclusive)
pub fn classify(kind: CoefficientKind, value: f64) -> UniformityClassification {
    let table = bands(kind);
    // NaN matches no floor and lands in the open lowest band
    let band = table
        .iter()
        .find(|band| value >= band.floor)
        .unwrap_or(&table[table.len() - 1]);

    UniformityClassification {
        value,
        class: band.class,
        color: band.color.to_string(),
        description: band.description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(85.857864), 85.86);
        assert_eq!(round2(88.00000000000001), 88.0);
    }

    #[test]
    fn quarter_of_single_value_is_the_value() {
        let coefficients = compute_coefficients(&[4.2]).unwrap();
        assert_eq!(coefficients.cud, 100.0);
        assert_eq!(coefficients.cuc, 100.0);
        assert_eq!(coefficients.cue, 100.0);
    }

    #[test]
    fn nan_is_classified_in_lowest_band() {
        let classification = classify(CoefficientKind::Cue, f64::NAN);
        assert_eq!(classification.class, UniformityClass::Inacceptable);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("CUD".parse::<CoefficientKind>(), Ok(CoefficientKind::Cud));
        assert!("cux".parse::<CoefficientKind>().is_err());
    }
}
