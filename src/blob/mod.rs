//! Azure Blob Storage staging for local templates
//!
//! Resource Manager can only deploy a local template inline or by link.
//! This module uploads local templates to a storage container so they can
//! be deployed by link.

pub mod stager;

pub use stager::*;
