use connectors::error::ConnectorError;
use engine::error::FlowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown flow '{0}'; see `reflow flows` for configured flows")]
    UnknownFlow(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Failed to serialize output to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
