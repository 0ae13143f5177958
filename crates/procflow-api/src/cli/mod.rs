//! CLI command definitions for the `procflow` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod process;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run and inspect process instances.
#[derive(Parser)]
#[command(name = "procflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate a definition file without storing it.
    Validate {
        /// Path to a YAML or JSON definition.
        file: PathBuf,
    },

    /// Instantiate a process from a definition file.
    Create {
        /// Path to a YAML or JSON definition.
        file: PathBuf,

        /// Metadata entry (`key=value`, value parsed as JSON when possible).
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// List process instances, most recently updated first.
    #[command(alias = "ls")]
    List {
        /// Maximum number of processes to show.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show the node states of a process.
    Show {
        /// Process id.
        id: String,
    },

    /// Store the input payload for a node.
    Input {
        /// Process id.
        id: String,

        /// Node id the payload is addressed to.
        node: String,

        /// JSON payload.
        payload: String,

        /// Trigger the process right after storing the input.
        #[arg(long)]
        execute: bool,
    },

    /// Mark a task as done and trigger the process.
    Complete {
        /// Process id.
        id: String,

        /// Task node id.
        task: String,
    },

    /// Set the condition of a conditional flow and trigger the process.
    Decide {
        /// Process id.
        id: String,

        /// Sequence flow id.
        flow: String,

        /// Condition outcome.
        #[arg(action = clap::ArgAction::Set)]
        condition: bool,
    },

    /// Trigger a process.
    Execute {
        /// Process id.
        id: String,

        /// Start at this node instead of the root.
        #[arg(long)]
        node: Option<String>,
    },

    /// Delete a process.
    #[command(alias = "rm")]
    Delete {
        /// Process id.
        id: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
