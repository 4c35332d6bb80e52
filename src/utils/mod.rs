//! Utility functions module
//!
//! This module contains cooperative cancellation, retry logic, HTTP client
//! helpers, output formatting, interactive prompts and other helpers.

pub mod cancel;
pub mod format;
pub mod helpers;
pub mod interactive;
pub mod network;
pub mod retry;

pub use cancel::*;
pub use format::*;
pub use helpers::*;
pub use network::*;
pub use retry::*;
