use crate::{
    error::{FlowError, FlowStep},
    loader::BatchLoader,
    transform,
};
use connectors::{
    capability::{DataSink, DataSource},
    error::ConnectorError,
};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::info;

/// Typed binding of the two flow roles, resolved at construction time.
#[derive(Clone)]
pub struct Bindings {
    pub source: Arc<dyn DataSource>,
    pub target: Arc<dyn DataSink>,
}

/// One named truncate-and-reload job: which query feeds which table,
/// and how large each committed batch is.
#[derive(Debug, Clone)]
pub struct FlowSpec {
    pub name: String,
    pub extract_query: String,
    pub target_table: String,
    pub batch_size: usize,
}

/// Outcome of a completed flow.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flow: String,
    pub rows_loaded: usize,
    pub batches: usize,
    pub elapsed_ms: u64,
}

/// Executes one flow as a linear state machine:
/// VALIDATE → TRUNCATE → EXTRACT → NORMALIZE → LOAD → DONE.
/// Any step failure halts the flow; batches committed before a LOAD
/// failure stay committed.
pub struct EtlFlow {
    spec: FlowSpec,
    bindings: Bindings,
}

impl EtlFlow {
    pub fn new(spec: FlowSpec, bindings: Bindings) -> Self {
        EtlFlow { spec, bindings }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub async fn run(&self) -> Result<FlowReport, FlowError> {
        let start = Instant::now();
        let fail = |step: FlowStep, rows_loaded: usize, source: ConnectorError| FlowError {
            flow: self.spec.name.clone(),
            step,
            table: self.spec.target_table.clone(),
            rows_loaded,
            source,
        };

        info!(
            flow = %self.spec.name,
            source = self.bindings.source.backend(),
            target = self.bindings.target.backend(),
            table = %self.spec.target_table,
            "flow starting"
        );

        // Validation must run before the destructive step: a bad
        // extract must never leave the target empty.
        self.bindings
            .source
            .validate()
            .await
            .map_err(|err| fail(FlowStep::Validate, 0, err))?;

        let truncate = format!("TRUNCATE TABLE {}", self.spec.target_table);
        self.bindings
            .target
            .execute(&truncate)
            .await
            .map_err(|err| fail(FlowStep::Truncate, 0, err))?;
        info!(flow = %self.spec.name, table = %self.spec.target_table, "target truncated");

        let extracted = self
            .bindings
            .source
            .read(&self.spec.extract_query)
            .await
            .map_err(|err| fail(FlowStep::Extract, 0, err))?;
        info!(flow = %self.spec.name, rows = extracted.len(), "extracted");

        let normalized = transform::normalize(&extracted);

        let loader = BatchLoader::new(self.spec.batch_size);
        let report = loader
            .load(
                self.bindings.target.as_ref(),
                &normalized,
                &self.spec.target_table,
            )
            .await
            .map_err(|failure| fail(FlowStep::Load, failure.report.rows_loaded, failure.source))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            flow = %self.spec.name,
            rows = report.rows_loaded,
            batches = report.batches,
            elapsed_ms,
            "flow done"
        );

        Ok(FlowReport {
            flow: self.spec.name.clone(),
            rows_loaded: report.rows_loaded,
            batches: report.batches,
            elapsed_ms,
        })
    }
}

/// Registry of independent named flows sharing nothing but their
/// bindings. Flows run one at a time.
pub struct FlowSet {
    flows: Vec<EtlFlow>,
    default_flow: Option<String>,
}

impl FlowSet {
    pub fn new() -> Self {
        FlowSet {
            flows: Vec::new(),
            default_flow: None,
        }
    }

    pub fn register(mut self, flow: EtlFlow) -> Self {
        if self.default_flow.is_none() {
            self.default_flow = Some(flow.name().to_string());
        }
        self.flows.push(flow);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.flows.iter().map(|f| f.name()).collect()
    }

    /// Resolves a flow by name; `None` means the default (first
    /// registered) flow.
    pub fn get(&self, name: Option<&str>) -> Option<&EtlFlow> {
        let wanted = name.or(self.default_flow.as_deref())?;
        self.flows.iter().find(|f| f.name() == wanted)
    }
}

impl Default for FlowSet {
    fn default() -> Self {
        Self::new()
    }
}
