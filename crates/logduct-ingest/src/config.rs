//! Run configuration
//!
//! [`JobArgs`] is the command-line/environment surface; it is turned into a
//! validated [`BatchJob`] once at startup and the pipeline only ever sees the
//! job.
//!
//! Environment variables keep the names used by existing deployments
//! (`NGINX2P_*` for the job, libpq's `PG*` for the connection).

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use sqlx::postgres::PgConnectOptions;

use crate::error::{IngestError, Result};
use crate::storage::postgres::is_valid_table_name;
use crate::storage::DEFAULT_TABLE;
use crate::template::DEFAULT_LOG_FORMAT;

/// Example invocation shown on failure
pub const USAGE_EXAMPLE: &str = r#"NGINX2P_LOG_FILE=./access.log NGINX2P_LOG_FORMAT="" NGINX2P_MAXLINES=100000 NGINX2P_TRUNCATE_TABLE=1 PGHOST=localhost PGUSER=loader PGDATABASE=weblogs PGPASSWORD= logduct"#;

/// Job options, from flags or environment
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Access log file to load
    #[arg(long, env = "NGINX2P_LOG_FILE")]
    pub log_file: PathBuf,

    /// nginx log_format string; empty uses the built-in default
    #[arg(long, env = "NGINX2P_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Stop after this many rows; zero or negative means no limit
    #[arg(long, env = "NGINX2P_MAXLINES", allow_negative_numbers = true)]
    pub max_lines: Option<i64>,

    /// Empty the table before loading (1/t/true, 0/f/false)
    #[arg(
        long,
        env = "NGINX2P_TRUNCATE_TABLE",
        value_parser = parse_bool_flag,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub truncate: bool,

    /// Destination table
    #[arg(long, env = "NGINX2P_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// PostgreSQL URL; when unset the libpq PG* variables are used
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Parse a boolean the way Go's `strconv.ParseBool` does.
///
/// Values outside that vocabulary disable the flag rather than failing, which
/// is how the variable has always been read.
pub fn parse_bool_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True"))
}

/// Where the rows go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationConfig {
    pub database_url: Option<String>,
}

impl DestinationConfig {
    /// Connection options from the URL, or from libpq environment variables
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self.database_url.as_deref() {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| IngestError::Config(format!("Invalid database URL: {}", e))),
            None => Ok(PgConnectOptions::new()),
        }
    }
}

/// Parameters of one load run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub source_path: PathBuf,
    pub format: String,
    pub max_lines: Option<NonZeroU64>,
    pub truncate: bool,
    pub table: String,
    pub destination: DestinationConfig,
}

impl BatchJob {
    /// Job with defaults for everything but the source file
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            format: DEFAULT_LOG_FORMAT.to_string(),
            max_lines: None,
            truncate: false,
            table: DEFAULT_TABLE.to_string(),
            destination: DestinationConfig::default(),
        }
    }

    /// Use `format`, or the default format when it is empty
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        self.format = if format.is_empty() {
            DEFAULT_LOG_FORMAT.to_string()
        } else {
            format
        };
        self
    }

    /// Row limit; zero or negative means unlimited
    pub fn with_max_lines(mut self, max_lines: i64) -> Self {
        self.max_lines = u64::try_from(max_lines).ok().and_then(NonZeroU64::new);
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_destination(mut self, destination: DestinationConfig) -> Self {
        self.destination = destination;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_path.as_os_str().is_empty() {
            return Err(IngestError::Config("Log file path cannot be empty".to_string()));
        }

        if !is_valid_table_name(&self.table) {
            return Err(IngestError::Config(format!(
                "Invalid table name '{}': expected [schema.]name of letters, digits and '_'",
                self.table
            )));
        }

        Ok(())
    }
}

impl TryFrom<JobArgs> for BatchJob {
    type Error = IngestError;

    fn try_from(args: JobArgs) -> Result<Self> {
        let mut job = BatchJob::new(args.log_file)
            .with_format(args.log_format.unwrap_or_default())
            .with_truncate(args.truncate)
            .with_table(args.table)
            .with_destination(DestinationConfig {
                database_url: args.database_url,
            });
        if let Some(max_lines) = args.max_lines {
            job = job.with_max_lines(max_lines);
        }

        job.validate()?;
        Ok(job)
    }
}
