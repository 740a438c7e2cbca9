//! Shared domain logic for the atelier production back office
//!
//! This crate holds the material consumption engine without any I/O: the
//! requirement calculator, stock arithmetic and ledger reconciliation, used by
//! the backend and (through WASM) by planning screens.

pub mod models;
pub mod requirements;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use requirements::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
