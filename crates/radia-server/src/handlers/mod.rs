//! HTTP request handlers, one module per endpoint.

pub mod predict;
pub mod recent;
pub mod report;
pub mod stats;
