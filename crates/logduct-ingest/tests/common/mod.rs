//! Shared fixtures for logduct-ingest integration tests
//!
//! - [`MemoryConnector`]: an in-memory destination that records every call
//! - [`log_line`] / [`write_log`]: access-log lines in the default format

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use logduct_common::types::TypedRow;
use logduct_ingest::error::LoadError;
use logduct_ingest::{Connector, Destination, RowBatch};
use tempfile::NamedTempFile;

pub const MEMORY_TABLE: &str = "memory_access_logs";

/// Contents of the in-memory table plus a call log
#[derive(Debug, Default)]
pub struct MemoryTable {
    pub created: bool,
    pub rows: Vec<TypedRow>,
    pub calls: Vec<&'static str>,
}

/// Connector over a shared [`MemoryTable`]
#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub table: Arc<Mutex<MemoryTable>>,
    connects: Arc<AtomicUsize>,
    fail_truncate: bool,
    under_report: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table that already exists and holds `count` rows
    pub fn with_existing_rows(count: u64) -> Self {
        let connector = Self::default();
        {
            let mut table = connector.table.lock().unwrap();
            table.created = true;
            table.rows = (1..=count).map(row).collect();
        }
        connector
    }

    /// Truncate fails with a server error
    pub fn failing_truncate(mut self) -> Self {
        self.fail_truncate = true;
        self
    }

    /// Bulk insert reports one row fewer than it stored
    pub fn under_reporting(mut self) -> Self {
        self.under_report = true;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.table.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Destination = MemoryDestination;

    async fn connect(&self) -> Result<MemoryDestination, LoadError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryDestination {
            table: Arc::clone(&self.table),
            fail_truncate: self.fail_truncate,
            under_report: self.under_report,
        })
    }
}

pub struct MemoryDestination {
    table: Arc<Mutex<MemoryTable>>,
    fail_truncate: bool,
    under_report: bool,
}

#[async_trait]
impl Destination for MemoryDestination {
    fn table(&self) -> &str {
        MEMORY_TABLE
    }

    async fn ensure_table(&mut self) -> Result<(), LoadError> {
        let mut table = self.table.lock().unwrap();
        table.calls.push("ensure_table");
        table.created = true;
        Ok(())
    }

    async fn truncate(&mut self) -> Result<(), LoadError> {
        let mut table = self.table.lock().unwrap();
        table.calls.push("truncate");
        if self.fail_truncate {
            return Err(LoadError::Truncate {
                table: MEMORY_TABLE.to_string(),
                source: sqlx::Error::Protocol("permission denied for table".into()),
            });
        }
        table.rows.clear();
        Ok(())
    }

    async fn bulk_insert(&mut self, batch: &RowBatch) -> Result<u64, LoadError> {
        let mut table = self.table.lock().unwrap();
        table.calls.push("bulk_insert");
        table.rows.extend(batch.iter().cloned());

        let reported = batch.len() as u64;
        Ok(if self.under_report {
            reported.saturating_sub(1)
        } else {
            reported
        })
    }
}

/// A pre-existing row, distinguishable by its `host`
pub fn row(line_no: u64) -> TypedRow {
    TypedRow {
        line_no,
        request: "GET /old HTTP/1.1".into(),
        status: 200,
        body_bytes_sent: 0,
        remote_addr: "127.0.0.1".into(),
        upstream_response_time: 0.0,
        http_x_forwarded_for: "-".into(),
        host: "previous-run.example".into(),
        remote_user: "-".into(),
        time_local: "15/Oct/2026:23:59:59 +0000".into(),
        http_referer: "-".into(),
        http_user_agent: "seed".into(),
        request_time: 0.0,
    }
}

/// One line in the default log format
pub fn log_line(status: &str, body_bytes_sent: &str, upstream_response_time: &str) -> String {
    format!(
        "203.0.113.9 shop.example.com - - [16/Oct/2026:10:00:00 +0000] \"GET /cart HTTP/1.1\" \
         {} {} \"https://shop.example.com/\" \"Mozilla/5.0 (X11; Linux x86_64)\" 10.0.0.4 0.010 {}",
        status, body_bytes_sent, upstream_response_time
    )
}

/// Write `lines` to a temporary log file
pub fn write_log<S: AsRef<str>>(lines: &[S]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line.as_ref()).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Route test logs through the test harness' captured output
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("logduct_ingest=debug")
        .try_init();
}
