//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides configuration management and the error taxonomy.

pub mod config;
pub mod error;
