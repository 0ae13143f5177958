//! procflow CLI entry point.
//!
//! Binary name: `procflow`
//!
//! Parses CLI arguments, initializes tracing, the database and the process
//! service, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions need neither tracing nor app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "procflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = state::load_config().await;

    let filter = log_filter(&cli, &config);
    procflow_observe::tracing_setup::init_tracing(&filter, cli.otel)
        .map_err(anyhow::Error::msg)?;

    let result = run(cli, config).await;
    procflow_observe::tracing_setup::shutdown_tracing();
    result
}

/// Default tracing filter for the requested verbosity.
fn log_filter(cli: &Cli, config: &procflow_types::config::EngineConfig) -> String {
    match cli.verbose {
        0 if cli.quiet => "error".to_string(),
        0 => config.log_filter.clone().unwrap_or_else(|| "warn".to_string()),
        1 => "info,procflow_core=debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn run(cli: Cli, config: procflow_types::config::EngineConfig) -> anyhow::Result<()> {
    let out = cli::process::Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    // Validation only needs the registry
    if let Commands::Validate { file } = &cli.command {
        return cli::process::validate(file, out);
    }

    let state = AppState::init(config).await?;

    match cli.command {
        Commands::Create { file, meta } => {
            cli::process::create(&state, &file, &meta, out).await?;
        }
        Commands::List { limit } => {
            cli::process::list(&state, limit, out).await?;
        }
        Commands::Show { id } => {
            cli::process::show(&state, &id, out).await?;
        }
        Commands::Input {
            id,
            node,
            payload,
            execute,
        } => {
            cli::process::input(&state, &id, &node, &payload, execute, out).await?;
        }
        Commands::Complete { id, task } => {
            cli::process::complete(&state, &id, &task, out).await?;
        }
        Commands::Decide {
            id,
            flow,
            condition,
        } => {
            cli::process::decide(&state, &id, &flow, condition, out).await?;
        }
        Commands::Execute { id, node } => {
            cli::process::execute(&state, &id, node.as_deref(), out).await?;
        }
        Commands::Delete { id } => {
            cli::process::delete(&state, &id, out).await?;
        }
        Commands::Validate { .. } | Commands::Completions { .. } => {}
    }

    state.db_pool.close().await;
    Ok(())
}
