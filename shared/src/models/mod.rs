//! Domain models for the Irrigation Uniformity Platform

mod evaluation;
mod irrigation_unit;
mod uniformity;

pub use evaluation::*;
pub use irrigation_unit::*;
pub use uniformity::*;
