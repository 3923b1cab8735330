//! PostgreSQL destination
//!
//! Rows are loaded with a single `COPY ... FROM STDIN` in text format, so the
//! insert is one statement regardless of batch size and is atomic on the
//! server side.

use std::fmt::Write as _;

use async_trait::async_trait;
use logduct_common::types::{column_list, TypedRow, COLUMNS};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info};

use super::{Connector, Destination};
use crate::batch::RowBatch;
use crate::error::LoadError;

/// Table loaded when none is configured
pub const DEFAULT_TABLE: &str = "nginx_access_logs";

/// Bytes per `CopyData` message
const COPY_CHUNK_SIZE: usize = 1 << 20;

/// Whether `name` is usable as an unquoted table name (optionally `schema.table`)
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        })
}

/// `CREATE TABLE IF NOT EXISTS` for the access-log schema
pub fn create_table_sql(table: &str) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| format!("    {} {}", c.name, c.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {}\n(\n{}\n)", table, columns)
}

pub fn truncate_sql(table: &str) -> String {
    format!("TRUNCATE {}", table)
}

pub fn copy_sql(table: &str) -> String {
    format!("COPY {} ({}) FROM STDIN", table, column_list())
}

/// Escape a value for COPY text format
fn push_text(buf: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => buf.push_str("\\\\"),
            '\t' => buf.push_str("\\t"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            _ => buf.push(c),
        }
    }
}

fn push_float(buf: &mut String, value: f64) {
    if value.is_nan() {
        buf.push_str("NaN");
    } else if value.is_infinite() {
        buf.push_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let _ = write!(buf, "{}", value);
    }
}

/// Append one row as a COPY text line, columns in table order
pub fn encode_row(buf: &mut String, row: &TypedRow) {
    let _ = write!(buf, "{}\t", row.line_no);
    push_text(buf, &row.request);
    let _ = write!(buf, "\t{}\t{}\t", row.status, row.body_bytes_sent);
    push_text(buf, &row.remote_addr);
    buf.push('\t');
    push_float(buf, row.upstream_response_time);
    for text in [
        &row.http_x_forwarded_for,
        &row.host,
        &row.remote_user,
        &row.time_local,
        &row.http_referer,
        &row.http_user_agent,
    ] {
        buf.push('\t');
        push_text(buf, text);
    }
    buf.push('\t');
    push_float(buf, row.request_time);
    buf.push('\n');
}

/// Encode a whole batch as a COPY text payload
pub fn encode_batch(batch: &RowBatch) -> String {
    let mut buf = String::with_capacity(batch.len() * 256);
    for row in batch {
        encode_row(&mut buf, row);
    }
    buf
}

/// Connects to PostgreSQL with libpq-style options
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    table: String,
}

impl PgConnector {
    pub fn new(options: PgConnectOptions, table: impl Into<String>) -> Self {
        Self {
            options,
            table: table.into(),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Destination = PgDestination;

    async fn connect(&self) -> Result<PgDestination, LoadError> {
        debug!(
            host = self.options.get_host(),
            database = self.options.get_database(),
            "Connecting to PostgreSQL"
        );
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(LoadError::Connect)?;

        Ok(PgDestination::new(conn, self.table.clone()))
    }
}

/// A single PostgreSQL connection dedicated to one load
pub struct PgDestination {
    conn: PgConnection,
    table: String,
}

impl PgDestination {
    pub fn new(conn: PgConnection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }
}

#[async_trait]
impl Destination for PgDestination {
    fn table(&self) -> &str {
        &self.table
    }

    async fn ensure_table(&mut self) -> Result<(), LoadError> {
        sqlx::query(&create_table_sql(&self.table))
            .execute(&mut self.conn)
            .await
            .map_err(|source| LoadError::Schema {
                table: self.table.clone(),
                source,
            })?;
        Ok(())
    }

    async fn truncate(&mut self) -> Result<(), LoadError> {
        sqlx::query(&truncate_sql(&self.table))
            .execute(&mut self.conn)
            .await
            .map_err(|source| LoadError::Truncate {
                table: self.table.clone(),
                source,
            })?;
        Ok(())
    }

    async fn bulk_insert(&mut self, batch: &RowBatch) -> Result<u64, LoadError> {
        let table = self.table.clone();
        let insert_error = |source: sqlx::Error| LoadError::Insert {
            table: table.clone(),
            source,
        };

        let payload = encode_batch(batch);
        info!(rows = batch.len(), bytes = payload.len(), "Copying rows into {}", table);

        let mut copy = self
            .conn
            .copy_in_raw(&copy_sql(&table))
            .await
            .map_err(insert_error)?;

        for chunk in payload.as_bytes().chunks(COPY_CHUNK_SIZE) {
            let sent = copy.send(chunk).await.map(|_| ());
            if let Err(source) = sent {
                // Leave the connection usable; the server discards the partial copy
                let _ = copy.abort(source.to_string()).await;
                return Err(insert_error(source));
            }
        }

        copy.finish().await.map_err(insert_error)
    }
}
