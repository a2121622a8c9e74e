//! Shared types and models for the Irrigation Uniformity Platform
//!
//! This crate holds the uniformity engine (flow-rate derivation, CUC/CUD/CUE
//! and their quality bands) and the models shared between the backend and
//! the offline field client (via WASM).

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
