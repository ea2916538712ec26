use connectors::error::ConnectorError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Steps of one flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowStep {
    Validate,
    Truncate,
    Extract,
    Normalize,
    Load,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Validate => "VALIDATE",
            FlowStep::Truncate => "TRUNCATE",
            FlowStep::Extract => "EXTRACT",
            FlowStep::Normalize => "NORMALIZE",
            FlowStep::Load => "LOAD",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flow failure with enough context to diagnose: which flow, which
/// step, which table, and how many rows were already committed by
/// per-batch loading before the failure.
#[derive(Debug, Error)]
#[error("flow '{flow}' failed at {step} (table '{table}', {rows_loaded} rows committed): {source}")]
pub struct FlowError {
    pub flow: String,
    pub step: FlowStep,
    pub table: String,
    pub rows_loaded: usize,
    #[source]
    pub source: ConnectorError,
}
