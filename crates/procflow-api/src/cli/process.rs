//! Process CLI commands: validate, create, list, show, input, complete,
//! decide, execute, delete.

use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use procflow_core::definition::load_definition_file;
use procflow_core::registry::NodeRegistry;
use procflow_core::report::TriggerReport;
use procflow_types::node::{Node, State};
use procflow_types::process::Process;
use procflow_types::tree::ProcessTree;

use crate::state::AppState;

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Parse and validate a definition file.
pub fn validate(file: &Path, out: Output) -> Result<()> {
    let registry = NodeRegistry::with_defaults();
    let tree = load_definition_file(file, &registry)
        .with_context(|| format!("invalid definition {}", file.display()))?;

    if out.json {
        let summary = json!({
            "valid": true,
            "root": tree.root_id(),
            "nodes": tree.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if out.quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} {} is valid ({} nodes)",
        style("✓").green().bold(),
        style(file.display()).cyan(),
        tree.len()
    );
    println!();
    println!("{}", node_table(&tree));
    println!();
    Ok(())
}

/// Instantiate a process from a definition file.
///
/// # Examples
///
/// ```bash
/// procflow create order.yaml --meta customer=acme --meta priority=2
/// ```
pub async fn create(state: &AppState, file: &Path, meta: &[String], out: Output) -> Result<()> {
    let definition = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let metadata = parse_meta_entries(meta)?;

    let process = state
        .process_service
        .instantiate(&definition, metadata)
        .await?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&process_summary(&process))?);
        return Ok(());
    }
    if out.quiet {
        println!("{}", process.id);
        return Ok(());
    }

    println!();
    println!("  {} Process created", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("ID:").bold(), style(process.id).cyan());
    println!(
        "  {}  {}",
        style("Root:").bold(),
        process.tree.root().debug_name()
    );
    println!("  {}  {}", style("Nodes:").bold(), process.tree.len());
    println!();
    println!(
        "  Start it with: {}",
        style(format!("procflow execute {}", process.id)).yellow()
    );
    println!();
    Ok(())
}

/// List processes in a table.
pub async fn list(state: &AppState, limit: Option<i64>, out: Output) -> Result<()> {
    let processes = state.process_service.list(limit).await?;

    if out.json {
        let summaries: Vec<Value> = processes.iter().map(process_summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if out.quiet {
        return Ok(());
    }

    if processes.is_empty() {
        println!();
        println!(
            "  {} No processes found. Create one with: {}",
            style("i").blue().bold(),
            style("procflow create <file>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Root").fg(Color::White),
        Cell::new("State").fg(Color::White),
        Cell::new("Waiting on").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for process in &processes {
        let waiting: Vec<&str> = waiting_nodes(&process.tree)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(process.id),
            Cell::new(process.tree.root_id()),
            state_cell(process.root_state()),
            Cell::new(waiting.join(", ")),
            Cell::new(format_relative_time(&process.updated_at)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} process{}",
        processes.len(),
        if processes.len() == 1 { "" } else { "es" }
    );
    println!();
    Ok(())
}

/// Show every node of a process with its state.
pub async fn show(state: &AppState, id: &str, out: Output) -> Result<()> {
    let process = state.process_service.get(&parse_process_id(id)?).await?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&process)?);
        return Ok(());
    }
    if out.quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Process").bold(),
        style(process.id).cyan()
    );
    println!(
        "  {}  {}",
        style("State:").bold(),
        state_label(process.root_state())
    );
    if !process.metadata.is_empty() {
        println!(
            "  {}  {}",
            style("Metadata:").bold(),
            Value::Object(process.metadata.clone())
        );
    }
    println!(
        "  {}  {}",
        style("Created:").bold(),
        process.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("{}", node_table(&process.tree));

    if !process.input.is_empty() {
        println!();
        println!("  {}", style("Input").bold());
        for (node_id, payload) in &process.input {
            println!("    {} {}: {}", style("•").dim(), node_id, payload);
        }
    }
    println!();
    Ok(())
}

/// Store a JSON payload for a node, optionally triggering afterwards.
pub async fn input(
    state: &AppState,
    id: &str,
    node: &str,
    payload: &str,
    execute: bool,
    out: Output,
) -> Result<()> {
    let id = parse_process_id(id)?;
    let payload = parse_payload(payload)?;

    if execute {
        let (process, report) = state
            .process_service
            .set_input_and_trigger(&id, node, payload)
            .await?;
        return print_report(&process, &report, out);
    }

    let process = state.process_service.set_input(&id, node, payload).await?;
    if out.json {
        let stored = json!({
            "process_id": process.id,
            "node_id": node,
            "input": process.input_for(node),
        });
        println!("{}", serde_json::to_string_pretty(&stored)?);
    } else if !out.quiet {
        println!();
        println!(
            "  {} Input stored for '{}'",
            style("✓").green().bold(),
            style(node).cyan()
        );
        println!();
    }
    Ok(())
}

/// Signal task completion and trigger the process.
pub async fn complete(state: &AppState, id: &str, task: &str, out: Output) -> Result<()> {
    let (process, report) = state
        .process_service
        .set_input_and_trigger(&parse_process_id(id)?, task, json!({ "state": "end" }))
        .await?;
    print_report(&process, &report, out)
}

/// Set a flow condition and trigger the process.
pub async fn decide(
    state: &AppState,
    id: &str,
    flow: &str,
    condition: bool,
    out: Output,
) -> Result<()> {
    let (process, report) = state
        .process_service
        .set_input_and_trigger(&parse_process_id(id)?, flow, json!({ "condition": condition }))
        .await?;
    print_report(&process, &report, out)
}

/// Trigger a process from the root or from `node`.
pub async fn execute(state: &AppState, id: &str, node: Option<&str>, out: Output) -> Result<()> {
    let (process, report) = state
        .process_service
        .trigger(&parse_process_id(id)?, node)
        .await?;
    print_report(&process, &report, out)
}

/// Delete a process.
pub async fn delete(state: &AppState, id: &str, out: Output) -> Result<()> {
    let id = parse_process_id(id)?;
    if !state.process_service.delete(&id).await? {
        bail!("process {id} not found");
    }

    if out.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "deleted": id }))?);
    } else if !out.quiet {
        println!();
        println!("  {} Process {} deleted", style("✓").green().bold(), id);
        println!();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_report(process: &Process, report: &TriggerReport, out: Output) -> Result<()> {
    if out.json {
        let mut value = serde_json::to_value(report)?;
        if let Value::Object(map) = &mut value {
            map.insert("completed".to_string(), Value::Bool(report.completed()));
            let waiting: Vec<&str> = waiting_nodes(&process.tree)
                .into_iter()
                .map(|n| n.id.as_str())
                .collect();
            map.insert("waiting".to_string(), json!(waiting));
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if out.quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} Triggered {} from '{}' ({} steps)",
        style("✓").green().bold(),
        style(process.id).cyan(),
        report.entry,
        report.steps
    );
    println!(
        "  {}  {}",
        style("State:").bold(),
        state_label(report.root_state)
    );

    let waiting = waiting_nodes(&process.tree);
    if !waiting.is_empty() {
        println!("  {}", style("Waiting on:").bold());
        for node in waiting {
            println!("    {} {}", style("•").dim(), node.debug_name());
        }
    }

    if !report.is_clean() {
        println!();
        println!(
            "  {} {} branch{} halted:",
            style("!").yellow().bold(),
            report.failures.len(),
            if report.failures.len() == 1 { "" } else { "es" }
        );
        for failure in &report.failures {
            println!(
                "    {} {}: {}",
                style("•").dim(),
                style(&failure.node_id).yellow(),
                failure.error
            );
        }
    }
    println!();
    Ok(())
}

fn node_table(tree: &ProcessTree) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Node").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Tag").fg(Color::White),
        Cell::new("Parent").fg(Color::White),
        Cell::new("State").fg(Color::White),
    ]);

    for node in tree.iter() {
        table.add_row(vec![
            Cell::new(&node.id),
            Cell::new(node.element_type()),
            Cell::new(&node.tag),
            Cell::new(node.parent_id.as_deref().unwrap_or("-")),
            state_cell(node.state),
        ]);
    }
    table
}

fn state_cell(state: Option<State>) -> Cell {
    let cell = Cell::new(state_label(state));
    match state {
        Some(State::End) => cell.fg(Color::Green),
        Some(State::Wait) => cell.fg(Color::Yellow),
        Some(State::Start) => cell.fg(Color::Cyan),
        None => cell.fg(Color::DarkGrey),
    }
}

fn state_label(state: Option<State>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "not started".to_string(),
    }
}

fn process_summary(process: &Process) -> Value {
    json!({
        "id": process.id,
        "root": process.tree.root_id(),
        "state": process.root_state(),
        "metadata": process.metadata,
        "created_at": process.created_at,
        "updated_at": process.updated_at,
    })
}

/// Nodes waiting for external input, in tree order.
fn waiting_nodes(tree: &ProcessTree) -> Vec<&Node> {
    tree.iter()
        .filter(|n| n.state == Some(State::Wait) && !n.element_type().is_gateway())
        .collect()
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn parse_process_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("'{id}' is not a valid process id"))
}

/// Parse a JSON payload argument.
fn parse_payload(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("payload is not valid JSON: {raw}"))
}

/// Parse `key=value` metadata entries. Values that are valid JSON keep their
/// type; anything else is stored as a string.
fn parse_meta_entries(entries: &[String]) -> Result<Map<String, Value>> {
    let mut metadata = Map::new();
    for entry in entries {
        let Some((key, raw)) = entry.split_once('=') else {
            bail!("metadata entry '{entry}' must be KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("metadata entry '{entry}' has an empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}
