//! Template gallery module
//!
//! This module provides access to the template gallery: looking up gallery
//! items by identity and downloading their default deployment template.

pub mod client;
pub mod models;

pub use client::*;
pub use models::*;
