//! Template module
//!
//! This module resolves which template a deployment uses, discovers the
//! parameters it declares, and merges parameter values from every source
//! into the set submitted with the deployment.

pub mod discovery;
pub mod fetcher;
pub mod models;
pub mod parameters;
pub mod source;

pub use discovery::*;
pub use fetcher::*;
pub use models::*;
pub use parameters::*;
pub use source::*;
