//! Shared API types
//!
//! Response envelopes used by every ClarityForge HTTP service.

pub mod types;

pub use types::{ErrorResponse, StandardResponse};
