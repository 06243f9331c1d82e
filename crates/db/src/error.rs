//! Store-level error kinds.
//!
//! Each sync stage has its own variant so a failure can be attributed to the
//! stage that produced it. Any sqlx error that means the server could not be
//! reached is reported as [`StoreError::Connectivity`] instead, whatever the
//! stage.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Connectivity(#[source] sqlx::Error),

    #[error("Schema reconciliation failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Table {table} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        table: &'static str,
        columns: Vec<&'static str>,
    },

    #[error("Snapshot extraction failed: {0}")]
    Extract(#[source] sqlx::Error),

    #[error("Snapshot replace failed: {0}")]
    Replace(#[source] sqlx::Error),

    #[error("Online-count probe failed: {0}")]
    Probe(#[source] sqlx::Error),

    #[error("Status publish failed: {0}")]
    Publish(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    /// Wrap a sqlx error in the given stage variant, unless it is a
    /// connectivity failure.
    pub fn classify(err: sqlx::Error, stage: fn(sqlx::Error) -> StoreError) -> StoreError {
        if is_connectivity(&err) {
            StoreError::Connectivity(err)
        } else {
            stage(err)
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

fn is_connectivity(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
