//! Authentication module for Azure services
//!
//! This module provides bearer tokens for Azure Resource Manager, the
//! template gallery and Azure Storage using DefaultAzureCredential or a
//! service principal client secret.

pub mod provider;

pub use provider::*;
