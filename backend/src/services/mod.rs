//! Business logic services for the atelier production back office

pub mod batch;
pub mod configuration;
pub mod leftover;
pub mod ledger;
pub mod material;

pub use batch::BatchService;
pub use configuration::MaterialConfigurationSource;
pub use leftover::LeftoverService;
pub use ledger::LedgerService;
pub use material::MaterialService;
