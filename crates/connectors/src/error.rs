use thiserror::Error;

/// Failure taxonomy shared by every backend adapter.
///
/// Adapters never swallow errors; they attach backend and operation
/// context and return. Whether a failure aborts or continues is the
/// orchestrator's call.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The backend could not be opened or reached at all.
    #[error("{backend}: connection failed: {detail}")]
    Connectivity {
        backend: &'static str,
        detail: String,
    },

    /// A page request failed during pagination (non-2xx or transport).
    #[error("{backend}: fetch failed at {context}: {detail}")]
    Fetch {
        backend: &'static str,
        context: String,
        detail: String,
    },

    /// A read query or side-effecting statement failed.
    #[error("{backend}: statement failed ({query}): {detail}")]
    Query {
        backend: &'static str,
        query: String,
        detail: String,
    },

    /// A batch insert failed.
    #[error("{backend}: insert into '{table}' failed: {detail}")]
    Load {
        backend: &'static str,
        table: String,
        detail: String,
    },

    /// A record set or source file failed a precondition.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid or unsupported connection configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConnectorError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ConnectorError::Validation(_))
    }
}
