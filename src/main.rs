//! graphline CLI — spec.md §6, grounded on `tools/nika/src/main.rs`'s
//! `Cli`/`Commands` clap derive struct and `tracing_subscriber` initialization.

use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use tracing::info;

use graphline::dag::assembler::{GraphAssembler, StageSpec};
use graphline::event::graph::{EventFailure, EventValue, HookInvoker, HookOutput};
use graphline::hooks::types::Hook;
use graphline::runtime::{RunStatus, TransitionRunner};

#[derive(Parser)]
#[command(name = "graphline")]
#[command(about = "Stage-DAG scheduler and distributed coordinator for load-test graph execution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble and execute a graph definition.
    Run {
        /// Path to a graph definition file (YAML).
        graph_path: String,
    },
    /// Assemble a graph definition without executing it.
    Check {
        /// Path to a graph definition file (YAML).
        graph_path: String,
    },
    /// Introspect an assembled graph.
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Print every stage and its dependencies.
    Show { graph_path: String },
    /// Print the topological generation layering.
    Generations { graph_path: String },
    /// Print stage names only, one per line.
    Stages { graph_path: String },
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    stages: Vec<StageSpec>,
}

/// Dispatch strategy for the bare CLI: every hook succeeds trivially and
/// produces no values. Real hook execution is wired by an embedder through
/// the library's `HookInvoker` trait; the CLI itself is a dry-run/
/// introspection tool (spec.md §1 Non-goals — protocol and provider
/// internals are out of scope).
struct DryRunInvoker;

#[async_trait]
impl HookInvoker for DryRunInvoker {
    async fn invoke(&self, hook: &Hook, _inputs: &EventValue) -> Result<HookOutput, EventFailure> {
        info!(hook = %hook.name, stage = %hook.stage_name, "dispatching hook (dry run)");
        Ok(HookOutput::Values(EventValue::new()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { graph_path } => run_graph(&graph_path).await,
        Commands::Check { graph_path } => check_graph(&graph_path),
        Commands::Graph { action } => match action {
            GraphAction::Show { graph_path } => graph_show(&graph_path),
            GraphAction::Generations { graph_path } => graph_generations(&graph_path),
            GraphAction::Stages { graph_path } => graph_stages(&graph_path),
        },
    }
}

fn load_specs(path: &str) -> Result<Vec<StageSpec>, ExitCode> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("{} {}", "Error:".red().bold(), e);
        ExitCode::from(1)
    })?;
    let file: GraphFile = serde_yaml::from_str(&raw).map_err(|e| {
        eprintln!("{} {}", "Error:".red().bold(), e);
        ExitCode::from(1)
    })?;
    Ok(file.stages)
}

async fn run_graph(path: &str) -> ExitCode {
    let specs = match load_specs(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let assembled = match GraphAssembler::assemble(specs) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{} {}", "Assembly error:".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    let outcome = TransitionRunner::run(assembled, Arc::new(DryRunInvoker)).await;

    match outcome.status {
        RunStatus::Complete => {
            println!("{} graph run completed", "✓".green());
            ExitCode::from(0)
        }
        RunStatus::Failed => {
            eprintln!(
                "{} stage '{}' failed",
                "✗".red().bold(),
                outcome.failed_stage.as_deref().unwrap_or("<unknown>")
            );
            ExitCode::from(2)
        }
        RunStatus::Running => unreachable!("run() never returns while still running"),
    }
}

fn check_graph(path: &str) -> ExitCode {
    let specs = match load_specs(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match GraphAssembler::assemble(specs) {
        Ok(assembled) => {
            println!(
                "{} graph is valid ({} stages, {} generations)",
                "✓".green(),
                assembled.stages.len(),
                assembled.generations.len()
            );
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("{} {}", "Assembly error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn graph_show(path: &str) -> ExitCode {
    let specs = match load_specs(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match GraphAssembler::assemble(specs) {
        Ok(assembled) => {
            for name in assembled.flow.stages() {
                let deps = assembled.flow.get_dependencies(name);
                let dep_names: Vec<&str> = deps.iter().map(|d| d.as_ref()).collect();
                println!("{} <- [{}]", name.as_ref().cyan(), dep_names.join(", "));
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("{} {}", "Assembly error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn graph_generations(path: &str) -> ExitCode {
    let specs = match load_specs(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match GraphAssembler::assemble(specs) {
        Ok(assembled) => {
            for (i, layer) in assembled.generations.iter().enumerate() {
                let names: Vec<&str> = layer.iter().map(|s| s.as_ref()).collect();
                println!("{}: {}", format!("gen {i}").cyan().bold(), names.join(", "));
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("{} {}", "Assembly error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn graph_stages(path: &str) -> ExitCode {
    let specs = match load_specs(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match GraphAssembler::assemble(specs) {
        Ok(assembled) => {
            for name in assembled.flow.stages() {
                println!("{name}");
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("{} {}", "Assembly error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
