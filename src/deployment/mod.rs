//! Resource group deployments
//!
//! Deployment requests and records, the Resource Manager REST operations,
//! projection of raw responses, and the manager that drives a deployment
//! from template source to final state.

pub mod manager;
pub mod models;
pub mod operations;
pub mod projector;

pub use manager::*;
pub use models::*;
pub use operations::*;
pub use projector::*;
