//! Common utilities module
//!
//! Shared error type used across the depth pipeline.

pub mod error;

pub use error::{PipelineError, Result};
