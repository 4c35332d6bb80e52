//! rgdeploy - Azure Resource Manager template deployment tool
//!
//! Resolves a template source, discovers the parameters it declares, merges
//! parameter values from inline objects, parameter files and the command
//! line, and submits the result as a resource group deployment.

pub mod auth;
pub mod blob;
pub mod cli;
pub mod config;
pub mod deployment;
pub mod error;
pub mod gallery;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, RgDeployError};
