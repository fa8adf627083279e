//! pmo CLI: portfolio decision engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use pmo_engine::engine::Engine;
use pmo_engine::error::SnapshotError;

#[derive(Parser)]
#[command(name = "pmo", version, about = "Portfolio decision engine for project management offices")]
struct Cli {
    /// Portfolio snapshot (JSON).
    #[arg(long, global = true, default_value = "portfolio.json")]
    portfolio: PathBuf,

    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute scores and ranks for every project.
    Sync {
        /// Write the updated snapshot to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List tasks of a project that no requirement traces to.
    GhostTasks {
        /// Project ID.
        project: String,
    },

    /// Show delivery metrics for one project.
    ScopeMetrics {
        /// Project ID.
        project: String,
    },

    /// Show delivery metrics for every project plus a portfolio summary.
    Delivery,

    /// Forecast resource load.
    Forecast {
        /// Only forecast this resource.
        #[arg(long)]
        resource: Option<String>,

        /// Months to forecast (defaults to the configured horizon).
        #[arg(long)]
        months: Option<u32>,
    },

    /// Forecast all resources and report overloads and spare capacity.
    Analyze {
        /// Months to forecast (defaults to the configured horizon).
        #[arg(long)]
        months: Option<u32>,
    },

    /// Analyze inter-project dependencies.
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// List dependency cycles.
    Cycles,
    /// Show the longest chain of project durations.
    CriticalPath,
    /// Show projects directly blocked by a delayed project.
    Impact {
        /// Delayed project ID.
        project: String,
        /// Delay in days.
        #[arg(long)]
        delay_days: u32,
    },
    /// Show every project transitively blocked by a delayed project.
    Propagate {
        /// Delayed project ID.
        project: String,
        /// Delay in days.
        #[arg(long)]
        delay_days: u32,
    },
    /// Decide whether blocked dependents should suspend or keep waiting.
    CircuitBreaker {
        /// Delayed project ID.
        project: String,
        /// Delay in days.
        #[arg(long)]
        delay_days: u32,
        /// Cost of one day of waiting for a dependent.
        #[arg(long)]
        cost_per_day: f64,
        /// Only evaluate this dependent.
        #[arg(long)]
        affected: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    // stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine = Engine::from_files(&cli.portfolio, cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { output } => {
            let ranking = engine.sync();
            if let Some(path) = output {
                engine.save_snapshot(&path)?;
                tracing::info!(path = %path.display(), "snapshot written");
            }
            print_json(&ranking)?;
        }

        Commands::GhostTasks { project } => {
            let ghosts = engine
                .ghost_tasks(&project)
                .ok_or(SnapshotError::ProjectNotFound { project_id: project })?;
            print_json(&ghosts)?;
        }

        Commands::ScopeMetrics { project } => {
            let metrics = engine
                .scope_metrics(&project)
                .ok_or(SnapshotError::ProjectNotFound { project_id: project })?;
            print_json(&metrics)?;
        }

        Commands::Delivery => {
            print_json(&serde_json::json!({
                "projects": engine.delivery_all(),
                "summary": engine.delivery_summary(),
            }))?;
        }

        Commands::Forecast { resource, months } => match resource {
            Some(id) => {
                let prediction = engine
                    .forecast(&id, months)?
                    .ok_or(SnapshotError::ResourceNotFound { resource_id: id })?;
                print_json(&prediction)?;
            }
            None => print_json(&engine.forecast_all(months)?)?,
        },

        Commands::Analyze { months } => {
            print_json(&engine.analyze_predictions(months)?)?;
        }

        Commands::Graph { action } => match action {
            GraphAction::Cycles => print_json(&engine.detect_cycles()?)?,
            GraphAction::CriticalPath => print_json(&engine.critical_path()?)?,
            GraphAction::Impact {
                project,
                delay_days,
            } => print_json(&engine.analyze_impact(&project, delay_days))?,
            GraphAction::Propagate {
                project,
                delay_days,
            } => print_json(&engine.propagate_delay(&project, delay_days)?)?,
            GraphAction::CircuitBreaker {
                project,
                delay_days,
                cost_per_day,
                affected,
            } => print_json(&engine.circuit_breaker(
                &project,
                affected.as_deref(),
                delay_days,
                cost_per_day,
            ))?,
        },
    }

    Ok(())
}
