//! Domain models for material stock consumption

mod batch;
mod leftover;
mod ledger;
mod material;
mod plan;

pub use batch::*;
pub use leftover::*;
pub use ledger::*;
pub use material::*;
pub use plan::*;
