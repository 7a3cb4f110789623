//! # bomcat Common Library
//!
//! Shared code for bomcat services including:
//! - Event types (EnrichEvent enum) and the EventBus
//! - Common error type
//! - Configuration loading (TOML + environment overrides)

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
