//! corner-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the Open Corner workspace.

pub mod config;
pub mod errors;
pub mod types;
pub mod units;

pub use config::*;
pub use errors::*;
pub use types::*;
pub use units::*;
