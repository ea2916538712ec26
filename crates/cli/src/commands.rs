use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one flow end to end (the default flow when --flow is omitted)
    Run {
        /// Name of the flow to run
        #[arg(long)]
        flow: Option<String>,

        /// Optional .env file merged over the process environment
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Print the flow report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the configured flows
    Flows {
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Check that one of the configured backends is reachable
    TestConn {
        /// Which role to check
        #[arg(long, value_enum)]
        role: Role,

        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Role {
    Source,
    Target,
}
