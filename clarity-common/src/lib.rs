//! # ClarityForge Common Library
//!
//! Shared code for all ClarityForge services including:
//! - Bootstrap configuration loading (TOML + environment)
//! - API envelope types
//! - Timestamp helpers
//! - Common error types

pub mod api;
pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
