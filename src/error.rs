//! Rich diagnostic error types for the PMO engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Most computations are total and never
//! fail; the variants here cover the few conditions that must be escalated:
//! cyclic dependency data given to critical-path search, analysis deadlines,
//! and configuration/snapshot loading.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the PMO engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum PmoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dependency(#[from] DependencyError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read engine config: {path}")]
    #[diagnostic(
        code(pmo::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {path}: {message}")]
    #[diagnostic(
        code(pmo::config::parse),
        help("Check the TOML syntax. Unknown keys are rejected; see `EngineConfig` for the accepted fields.")
    )]
    Parse { path: String, message: String },

    #[error("invalid engine config: {message}")]
    #[diagnostic(
        code(pmo::config::invalid),
        help(
            "Blend weights must lie in [0, 1], windows and history lengths must be \
             positive, and thresholds must not be negative."
        )
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    #[error("failed to read portfolio snapshot: {path}")]
    #[diagnostic(
        code(pmo::snapshot::read),
        help("Ensure the snapshot file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse portfolio snapshot: {path}: {message}")]
    #[diagnostic(
        code(pmo::snapshot::parse),
        help(
            "The snapshot must be a JSON object with `projects`, `factorDefinitions` \
             and `resourcePool` arrays using camelCase field names."
        )
    )]
    Parse { path: String, message: String },

    #[error("failed to write portfolio snapshot: {path}")]
    #[diagnostic(
        code(pmo::snapshot::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("project not found: \"{project_id}\"")]
    #[diagnostic(
        code(pmo::snapshot::project_not_found),
        help("List the portfolio with `pmo sync` to see the known project ids.")
    )]
    ProjectNotFound { project_id: String },

    #[error("resource not found: \"{resource_id}\"")]
    #[diagnostic(
        code(pmo::snapshot::resource_not_found),
        help("The resource id must match an entry of the snapshot's `resourcePool`.")
    )]
    ResourceNotFound { resource_id: String },
}

// ---------------------------------------------------------------------------
// Forecast errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ForecastError {
    #[error("forecast for resource \"{resource_id}\" exceeded its deadline")]
    #[diagnostic(
        code(pmo::forecast::deadline),
        help("Raise `analysisTimeoutMs` in the engine config or forecast fewer months.")
    )]
    DeadlineExceeded { resource_id: String },

    #[error("invalid forecast horizon: {months} months")]
    #[diagnostic(
        code(pmo::forecast::horizon),
        help("Forecasts need a horizon of at least one month.")
    )]
    InvalidHorizon { months: u32 },
}

// ---------------------------------------------------------------------------
// Dependency graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DependencyError {
    #[error("dependency graph is not acyclic: {} cycle(s) detected", .cycles.len())]
    #[diagnostic(
        code(pmo::dependency::cyclic_graph),
        help(
            "Critical-path search requires an acyclic graph. Run `pmo graph cycles` \
             to list the offending chains and break one dependency in each."
        )
    )]
    CyclicGraph { cycles: Vec<Vec<String>> },

    #[error("dependency analysis exceeded its deadline after visiting {visited} node(s)")]
    #[diagnostic(
        code(pmo::dependency::deadline),
        help(
            "The graph is very large or deeply nested. Raise `analysisTimeoutMs` \
             or check the dependency data for malformed chains."
        )
    )]
    DeadlineExceeded { visited: usize },
}

/// Convenience result type for the PMO engine.
pub type PmoResult<T> = std::result::Result<T, PmoError>;
