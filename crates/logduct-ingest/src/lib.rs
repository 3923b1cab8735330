//! Logduct Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch loader for nginx access logs: parses each line with a configurable
//! `log_format` template, validates the fields against a fixed schema and bulk
//! loads the rows into PostgreSQL.
//!
//! # Stages
//!
//! - [`template`]: compile a `$name` format string into a line matcher
//! - [`reader`]: stream lines into raw field maps
//! - [`validate`]: type-check raw fields into rows
//! - [`batch`]: collect rows, honouring the row limit
//! - [`storage`]: create/truncate the table and `COPY` the batch
//! - [`pipeline`]: run the stages in order
//!
//! # Example
//!
//! ```no_run
//! use logduct_ingest::{pipeline, BatchJob, PgConnector};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let job = BatchJob::new("/var/log/nginx/access.log").with_truncate(true);
//!     let connector = PgConnector::new(job.destination.connect_options()?, &job.table);
//!
//!     let report = pipeline::run(&job, &connector).await?;
//!     println!("Rows {} inserted", report.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod storage;
pub mod template;
pub mod validate;

// Re-export commonly used types
pub use batch::RowBatch;
pub use config::BatchJob;
pub use error::{IngestError, Result};
pub use pipeline::LoadReport;
pub use storage::{Connector, Destination, PgConnector};
pub use template::LogFormatTemplate;
