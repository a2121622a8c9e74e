//! Errors raised by the uniformity calculations

use thiserror::Error;

/// Failures of the flow-rate and coefficient calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UniformityError {
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    #[error("Uniformity is undefined for an empty measurement set")]
    EmptyMeasurementSet,

    #[error("Mean flow rate is zero, coefficients are undefined")]
    DivisionByZero,
}
