//! Bulk load committer
//!
//! The destination is reached through two traits so the load sequence can run
//! against PostgreSQL ([`postgres`]) or an in-memory store in tests:
//!
//! - [`Connector`] opens a [`Destination`]; it is only called once the whole
//!   batch has been validated.
//! - [`Destination`] performs the three load steps.
//!
//! [`commit`] drives the steps in order and checks the inserted row count.

pub mod postgres;

use async_trait::async_trait;
use tracing::info;

use crate::batch::RowBatch;
use crate::error::LoadError;

pub use postgres::{PgConnector, PgDestination, DEFAULT_TABLE};

/// An open, exclusively owned connection to the destination table
#[async_trait]
pub trait Destination: Send {
    /// Destination table name, for diagnostics
    fn table(&self) -> &str;

    /// Create the table if it does not exist; never touches an existing table
    async fn ensure_table(&mut self) -> Result<(), LoadError>;

    /// Remove every row from the table
    async fn truncate(&mut self) -> Result<(), LoadError>;

    /// Insert the whole batch in one set-oriented operation
    ///
    /// Returns the row count reported by the store.
    async fn bulk_insert(&mut self, batch: &RowBatch) -> Result<u64, LoadError>;
}

/// Opens a [`Destination`]
#[async_trait]
pub trait Connector: Send + Sync {
    type Destination: Destination;

    async fn connect(&self) -> Result<Self::Destination, LoadError>;
}

/// Load `batch` into `dest`: ensure the table, optionally truncate, bulk insert
///
/// Fails if the store reports a row count different from the batch size.
pub async fn commit<D>(dest: &mut D, batch: &RowBatch, truncate: bool) -> Result<u64, LoadError>
where
    D: Destination + ?Sized,
{
    info!(table = dest.table(), "Check or create table");
    dest.ensure_table().await?;

    if truncate {
        info!(table = dest.table(), "Truncating table");
        dest.truncate().await?;
    }

    let expected = batch.len() as u64;
    let inserted = dest.bulk_insert(batch).await?;
    if inserted != expected {
        return Err(LoadError::CountMismatch {
            table: dest.table().to_string(),
            expected,
            inserted,
        });
    }

    info!(table = dest.table(), rows = inserted, "Rows {} inserted", inserted);
    Ok(inserted)
}
