//! Logduct - load an nginx access log into PostgreSQL

use clap::Parser;
use logduct_common::logging::{init_logging, LogConfig, LogLevel};
use logduct_ingest::config::{JobArgs, USAGE_EXAMPLE};
use logduct_ingest::{pipeline, BatchJob, LoadReport, PgConnector};
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "logduct")]
#[command(author, version, about = "Load an nginx access log into a PostgreSQL table")]
#[command(after_help = format!("Example:\n  {}", USAGE_EXAMPLE))]
struct Cli {
    #[command(flatten)]
    job: JobArgs,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("logduct")
        .build()
        .merge_env()?;

    let guard = init_logging(&log_config)?;

    match load(cli.job).await {
        Ok(report) => {
            info!(
                table = %report.table,
                rows = report.rows_inserted,
                truncated = report.truncated,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Load complete"
            );
            println!("Rows {} inserted", report.rows_inserted);
            Ok(())
        },
        Err(e) => {
            error!(error = %e, "Load aborted");
            eprintln!("Error: {}", e);
            eprintln!("Usage: {}", USAGE_EXAMPLE);
            // Flush file logs before exiting
            drop(guard);
            process::exit(1);
        },
    }
}

async fn load(args: JobArgs) -> logduct_ingest::Result<LoadReport> {
    let job = BatchJob::try_from(args)?;
    let connector = PgConnector::new(job.destination.connect_options()?, &job.table);

    pipeline::run(&job, &connector).await
}
