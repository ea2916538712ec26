use crate::{
    commands::{Commands, Role},
    config::AppConfig,
    env::EnvManager,
    error::CliError,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, info};

mod commands;
mod config;
mod env;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "reflow", version = "0.1.0", about = "Truncate-and-reload ETL runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            flow,
            env_file,
            json,
        } => {
            let config = load_config(env_file)?;
            let flows = config.build_flow_set()?;
            let job = flows
                .get(flow.as_deref())
                .ok_or_else(|| CliError::UnknownFlow(flow.unwrap_or_else(|| "default".into())))?;

            let report = job.run().await?;

            if json {
                output::print_report_json(&report)?;
            } else {
                output::print_report_table(&report);
            }
        }
        Commands::Flows { env_file } => {
            let config = load_config(env_file)?;
            let flows = config.build_flow_set()?;
            for name in flows.names() {
                println!("{name}");
            }
        }
        Commands::TestConn { role, env_file } => {
            let config = load_config(env_file)?;
            match role {
                Role::Source => {
                    let source = config.build_source()?;
                    source.validate().await?;
                    info!(backend = source.backend(), "source connection OK");
                }
                Role::Target => {
                    let target = config.build_target()?;
                    target.execute("SELECT 1").await?;
                    info!(backend = target.backend(), "target connection OK");
                }
            }
        }
    }

    Ok(())
}

fn load_config(env_file: Option<PathBuf>) -> Result<AppConfig, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    AppConfig::from_env(&env)
}
