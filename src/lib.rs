//! MACROFIN — European macro and FX data pipeline
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod resolver;
pub mod providers;
pub mod pipeline;
pub mod export;
