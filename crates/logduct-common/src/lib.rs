//! Logduct Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the logduct workspace.
//!
//! # Overview
//!
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: the fixed access-log table schema and the validated row type
//!
//! # Example
//!
//! ```no_run
//! use logduct_common::logging::{init_logging, LogConfig};
//! use logduct_common::types::COLUMNS;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!(columns = COLUMNS.len(), "Destination schema loaded");
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{Column, ColumnKind, TypedRow, COLUMNS};
