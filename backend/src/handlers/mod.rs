//! HTTP handlers for the Irrigation Uniformity Platform

pub mod area;
pub mod evaluation;
pub mod health;
pub mod uniformity;

pub use area::*;
pub use evaluation::*;
pub use health::*;
pub use uniformity::*;
