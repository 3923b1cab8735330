//! Load pipeline
//!
//! ```text
//! format string ──compile──▶ LogFormatTemplate
//! log file ──EntryReader──▶ RawEntry ──validate──▶ TypedRow ──▶ RowBatch
//! RowBatch ──Connector::connect──▶ Destination ──commit──▶ table
//! ```
//!
//! The file is read and validated completely before the destination is
//! contacted, so a bad line aborts the run with nothing written.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::NonZeroU64;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use crate::batch::{BatchAccumulator, Flow, RowBatch};
use crate::config::BatchJob;
use crate::error::{IngestError, Result};
use crate::reader::EntryReader;
use crate::storage::{commit, Connector};
use crate::template::LogFormatTemplate;
use crate::validate::validate;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub table: String,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub truncated: bool,
    pub elapsed: Duration,
}

/// Read and validate every line of `source` into a batch
///
/// Stops early, without consuming further input, once `max_rows` rows have
/// been accepted.
pub fn read_batch<R: BufRead>(
    source: R,
    template: &LogFormatTemplate,
    max_rows: Option<NonZeroU64>,
) -> Result<RowBatch> {
    let mut accumulator = BatchAccumulator::new(max_rows);

    for entry in EntryReader::new(source, template) {
        let (line_no, raw) = entry?;
        let row = validate(&raw, line_no)?;
        if accumulator.push(row) == Flow::CutoffReached {
            break;
        }
    }

    Ok(accumulator.finish())
}

/// Compile the job's format and read its source file into a batch
#[instrument(skip_all, fields(source = %job.source_path.display()))]
pub fn parse_source(job: &BatchJob) -> Result<RowBatch> {
    let template = LogFormatTemplate::compile(&job.format)?;

    let file = File::open(&job.source_path).map_err(|source| IngestError::Source {
        path: job.source_path.clone(),
        source,
    })?;

    info!("Start reading log file {}", job.source_path.display());
    read_batch(BufReader::new(file), &template, job.max_lines)
}

/// Run a whole load: parse, validate, then commit through `connector`
#[instrument(skip_all, fields(table = %job.table))]
pub async fn run<C: Connector>(job: &BatchJob, connector: &C) -> Result<LoadReport> {
    let started = Instant::now();

    let batch = parse_source(job)?;

    let mut destination = connector.connect().await?;
    let rows_inserted = commit(&mut destination, &batch, job.truncate).await?;

    Ok(LoadReport {
        table: job.table.clone(),
        rows_read: batch.len() as u64,
        rows_inserted,
        truncated: job.truncate,
        elapsed: started.elapsed(),
    })
}
