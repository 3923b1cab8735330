//! Destination schema and the validated row type
//!
//! The access-log table has a fixed 13-column layout. [`COLUMNS`] is the single
//! source of truth for column order, SQL types and string length limits; the
//! loader derives its DDL and `COPY` column list from it.

/// Length limit for short text columns (addresses, hosts, users, timestamps).
pub const SHORT_TEXT_MAX: usize = 255;

/// Length limit for long text columns (request line, referer, user agent).
pub const LONG_TEXT_MAX: usize = 4096;

/// SQL type of a destination column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 64-bit signed integer (`BIGINT`)
    BigInt,
    /// Bounded string (`VARCHAR(n)`), limit counted in characters
    Varchar(usize),
    /// 64-bit float (`DOUBLE PRECISION`)
    Double,
}

impl ColumnKind {
    /// SQL type as written in `CREATE TABLE`
    pub fn sql_type(self) -> String {
        match self {
            ColumnKind::BigInt => "BIGINT".to_string(),
            ColumnKind::Varchar(limit) => format!("VARCHAR({})", limit),
            ColumnKind::Double => "DOUBLE PRECISION".to_string(),
        }
    }
}

/// One column of the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }

    /// Maximum string length, if this is a bounded string column
    pub fn max_len(&self) -> Option<usize> {
        match self.kind {
            ColumnKind::Varchar(limit) => Some(limit),
            _ => None,
        }
    }
}

/// Destination columns in table order.
pub const COLUMNS: [Column; 13] = [
    Column::new("line_no", ColumnKind::BigInt),
    Column::new("request", ColumnKind::Varchar(LONG_TEXT_MAX)),
    Column::new("status", ColumnKind::BigInt),
    Column::new("body_bytes_sent", ColumnKind::BigInt),
    Column::new("remote_addr", ColumnKind::Varchar(SHORT_TEXT_MAX)),
    Column::new("upstream_response_time", ColumnKind::Double),
    Column::new("http_x_forwarded_for", ColumnKind::Varchar(SHORT_TEXT_MAX)),
    Column::new("host", ColumnKind::Varchar(SHORT_TEXT_MAX)),
    Column::new("remote_user", ColumnKind::Varchar(SHORT_TEXT_MAX)),
    Column::new("time_local", ColumnKind::Varchar(SHORT_TEXT_MAX)),
    Column::new("http_referer", ColumnKind::Varchar(LONG_TEXT_MAX)),
    Column::new("http_user_agent", ColumnKind::Varchar(LONG_TEXT_MAX)),
    Column::new("request_time", ColumnKind::Double),
];

/// Look up a destination column by name
pub fn column(name: &str) -> Option<&'static Column> {
    COLUMNS.iter().find(|c| c.name == name)
}

/// Comma-separated column names in table order, for DDL and `COPY`
pub fn column_list() -> String {
    COLUMNS.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
}

/// A validated access-log line, ready for loading.
///
/// Fields are declared in destination column order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    /// 1-based line number in the source file
    pub line_no: u64,
    pub request: String,
    pub status: i64,
    pub body_bytes_sent: i64,
    pub remote_addr: String,
    /// Zero when the log recorded `-` (no upstream was contacted)
    pub upstream_response_time: f64,
    pub http_x_forwarded_for: String,
    pub host: String,
    pub remote_user: String,
    pub time_local: String,
    pub http_referer: String,
    pub http_user_agent: String,
    pub request_time: f64,
}
