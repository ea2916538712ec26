use connectors::{capability::DataSink, error::ConnectorError};
use model::records::record_set::RecordSet;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Progress accounting for one load call.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub rows_loaded: usize,
    pub rows_remaining: usize,
    pub batches: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// A batch insert failed. Earlier batches stay committed; the report
/// says how far the load got.
#[derive(Debug, Error)]
#[error("batch {batch_index} failed after {} committed rows: {source}", report.rows_loaded)]
pub struct LoadFailure {
    pub batch_index: usize,
    pub report: LoadReport,
    #[source]
    pub source: ConnectorError,
}

/// Splits a record set into fixed-size batches and loads them one at a
/// time, each committed independently. Deliberately NOT one wrapping
/// transaction: partial loads on failure are observable, documented
/// behavior.
pub struct BatchLoader {
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        BatchLoader {
            batch_size: batch_size.max(1),
        }
    }

    pub async fn load(
        &self,
        sink: &dyn DataSink,
        record_set: &RecordSet,
        table: &str,
    ) -> Result<LoadReport, LoadFailure> {
        let start = Instant::now();
        let total = record_set.len();
        let mut rows_loaded = 0usize;
        let mut batches = 0usize;

        for batch in record_set.batches(self.batch_size) {
            if let Err(source) = sink.insert(&batch, record_set.columns(), table).await {
                let report = LoadReport {
                    rows_loaded,
                    rows_remaining: total - rows_loaded,
                    batches,
                    elapsed: start.elapsed(),
                };
                error!(
                    table,
                    batch = batch.index,
                    rows_loaded,
                    rows_remaining = report.rows_remaining,
                    error = %source,
                    "batch insert failed, stopping load"
                );
                return Err(LoadFailure {
                    batch_index: batch.index,
                    report,
                    source,
                });
            }

            rows_loaded += batch.len();
            batches += 1;
            info!(
                table,
                batch = batch.index,
                rows = batch.len(),
                rows_loaded,
                rows_remaining = total - rows_loaded,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "batch committed"
            );
        }

        Ok(LoadReport {
            rows_loaded,
            rows_remaining: total - rows_loaded,
            batches,
            elapsed: start.elapsed(),
        })
    }
}
