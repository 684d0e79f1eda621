//! Core types and trait definitions for the Radia X-ray triage service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod prediction;
pub mod store;

pub use error::{Error, Result};
