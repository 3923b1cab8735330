//! Row batch accumulation
//!
//! All validated rows of a run are held in memory until the whole file has
//! been checked; nothing is written to the destination before that.

use std::num::NonZeroU64;

use logduct_common::types::TypedRow;
use tracing::{debug, info};

/// Rows between progress log lines
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Every row produced by one run, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    rows: Vec<TypedRow>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TypedRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypedRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a RowBatch {
    type Item = &'a TypedRow;
    type IntoIter = std::slice::Iter<'a, TypedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Whether the caller should keep feeding rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The configured row limit has been reached
    CutoffReached,
}

/// Appends rows to a [`RowBatch`], honouring an optional row limit
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    batch: RowBatch,
    max_rows: Option<NonZeroU64>,
}

impl BatchAccumulator {
    pub fn new(max_rows: Option<NonZeroU64>) -> Self {
        Self {
            batch: RowBatch::default(),
            max_rows,
        }
    }

    /// Number of rows accepted so far
    pub fn len(&self) -> u64 {
        self.batch.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Append a row; the limit is checked after the row is stored
    pub fn push(&mut self, row: TypedRow) -> Flow {
        debug_assert!(
            self.batch.rows.last().map_or(true, |prev| prev.line_no < row.line_no),
            "line numbers must increase"
        );

        self.batch.rows.push(row);
        let count = self.len();

        if count % PROGRESS_INTERVAL == 0 {
            info!(rows = count, "{} read", count);
        }

        match self.max_rows {
            Some(max) if count >= max.get() => {
                debug!(max_rows = max.get(), "Reached row limit");
                Flow::CutoffReached
            },
            _ => Flow::Continue,
        }
    }

    pub fn finish(self) -> RowBatch {
        info!(rows = self.batch.len(), "Finished read: {} rows", self.batch.len());
        self.batch
    }
}
