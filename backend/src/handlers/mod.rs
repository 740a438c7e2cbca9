//! HTTP handlers for the atelier production API

pub mod batch;
pub mod health;
pub mod leftover;
pub mod material;
pub mod stock;

pub use batch::*;
pub use health::*;
pub use leftover::*;
pub use material::*;
pub use stock::*;
