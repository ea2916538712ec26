use crate::error::ConnectorError;
use async_trait::async_trait;
use model::records::{batch::InsertBatch, record_set::RecordSet};

/// Read capability of a backend adapter.
///
/// Connection discipline: every call opens its own connection and
/// releases it before returning. No pooling, no reuse across calls.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Runs a read query and materializes the result.
    async fn read(&self, query: &str) -> Result<RecordSet, ConnectorError>;

    /// Preflight check run before any destructive flow step. Backends
    /// with content preconditions (spreadsheet extracts) override this.
    async fn validate(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// Write capability of a backend adapter. Same connection discipline as
/// [`DataSource`].
#[async_trait]
pub trait DataSink: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Runs a non-query statement (or a query with side effects).
    /// Returns rows when the statement produced any.
    async fn execute(&self, statement: &str) -> Result<Option<RecordSet>, ConnectorError>;

    /// Appends one batch to `table` using a parameterized multi-row
    /// insert over the given column order, committed as one unit.
    async fn insert(
        &self,
        batch: &InsertBatch<'_>,
        columns: &[String],
        table: &str,
    ) -> Result<(), ConnectorError>;
}
