//! corner-api: HTTP API layer for Open Corner
//!
//! Exposes pool reads, quotes and the pool operations to the frontend.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, StateError};
