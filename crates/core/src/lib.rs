//! Core shared types for GameScout
//!
//! This crate contains:
//! - Catalog and profile data models
//! - The static mock catalog used when the live catalog is down
//! - Error types and the identity error message table
//! - The client-side route table and display helpers
//! - Backend traits for identity and profile storage (with `async` feature)

pub mod error;
pub mod format;
pub mod mock;
pub mod models;
pub mod routes;

#[cfg(feature = "async")]
pub mod identity;

pub use error::*;
pub use mock::MockCatalog;
pub use models::*;
pub use routes::Route;

#[cfg(feature = "async")]
pub use identity::*;
