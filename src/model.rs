//! Portfolio entity snapshots consumed by every analysis.
//!
//! These are read-only records supplied by the persistence/API layer. Field
//! names serialize as camelCase so snapshots exported by that layer load
//! without translation. Derived fields (`score`, `rank`) are only ever written
//! by [`crate::scoring::recompute_portfolio`], which returns a new snapshot.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

pub type ProjectId = String;
pub type TaskId = String;
pub type ResourceId = String;
pub type FactorId = String;

const SECONDS_PER_DAY: f64 = 86_400.0;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    #[default]
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Whether projects in this status still hold their resource commitments.
    pub fn consumes_resources(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Unit of a resource requirement's duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Day,
    Month,
    Year,
}

impl DurationUnit {
    /// Day-equivalents of one unit (day=1, month=30, year=365).
    pub fn days(&self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Month => 30.0,
            Self::Year => 365.0,
        }
    }
}

/// Kind of relationship between two projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// The source project must finish before the target can proceed.
    Blocks,
    /// The source project needs deliverables of the target.
    Requires,
    /// Informational link with no scheduling consequence.
    Related,
}

/// How badly a dependency hurts when it slips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A named, weighted scoring dimension shared by every project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorDefinition {
    pub id: FactorId,
    #[serde(default)]
    pub name: String,
    /// Non-negative weight.
    pub weight: f64,
}

/// Capacity of one resource pool entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePoolItem {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    pub total_quantity: f64,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A project's commitment on a resource: `count` units for `duration` × `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirement {
    pub resource_id: ResourceId,
    pub count: f64,
    pub duration: f64,
    #[serde(default)]
    pub unit: DurationUnit,
}

impl ResourceRequirement {
    /// Length of the commitment in day-equivalents.
    pub fn duration_days(&self) -> f64 {
        self.duration.max(0.0) * self.unit.days()
    }

    /// Person-day workload of the commitment.
    pub fn workload(&self) -> f64 {
        self.count * self.duration_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub name: String,
    /// Completion percentage. Fractional values are accepted; reads clamp to 0–100.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        self.completion() >= 100.0
    }

    /// Progress clamped to `[0, 100]`; NaN counts as 0.
    pub fn completion(&self) -> f64 {
        if self.progress.is_nan() {
            0.0
        } else {
            self.progress.clamp(0.0, 100.0)
        }
    }
}

/// An approved requirement and the tasks that implement it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub project_id: ProjectId,
    #[serde(default)]
    pub related_task_ids: BTreeSet<TaskId>,
}

/// An outgoing dependency declared on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyLink {
    pub target_project_id: ProjectId,
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub criticality: Criticality,
}

/// A directed edge of the portfolio dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDependency {
    pub from_project_id: ProjectId,
    pub to_project_id: ProjectId,
    pub dependency_type: DependencyType,
    pub criticality: Criticality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    /// Raw factor scores (0–10) keyed by factor definition id.
    #[serde(default)]
    pub factors: HashMap<FactorId, f64>,
    /// Derived by scoring; never edited by hand.
    #[serde(default)]
    pub score: f64,
    /// Derived by ranking; `None` until the portfolio has been synced.
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub resource_requirements: Vec<ResourceRequirement>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub dependencies: Vec<DependencyLink>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    /// A bare project with no factors, tasks or commitments.
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            factors: HashMap::new(),
            score: 0.0,
            rank: None,
            resource_requirements: Vec::new(),
            tasks: Vec::new(),
            requirements: Vec::new(),
            dependencies: Vec::new(),
            start_date: None,
            end_date: None,
            status: ProjectStatus::Active,
        }
    }

    /// Fractional calendar days between start and end, 0 when either is unset
    /// or the window is inverted.
    pub fn span_days(&self) -> f64 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => days_between(start, end),
            _ => 0.0,
        }
    }

    /// Whole days the project occupies, rounding partial days up.
    pub fn duration_days(&self) -> u64 {
        self.span_days().ceil() as u64
    }

    pub fn requires_resource(&self, resource_id: &str) -> bool {
        self.resource_requirements
            .iter()
            .any(|r| r.resource_id == resource_id)
    }
}

/// Fractional days from `start` to `end`, clamped at zero.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let seconds = (end - start).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

// ---------------------------------------------------------------------------
// Portfolio snapshot
// ---------------------------------------------------------------------------

/// Everything the engine reads: projects, the scoring basis and the resource pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub factor_definitions: Vec<FactorDefinition>,
    #[serde(default)]
    pub resource_pool: Vec<ResourcePoolItem>,
}

impl Portfolio {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| SnapshotError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| SnapshotError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourcePoolItem> {
        self.resource_pool.iter().find(|r| r.id == id)
    }

    /// Flatten every project's declared links into graph edges, in project order.
    pub fn dependency_edges(&self) -> Vec<ProjectDependency> {
        self.projects
            .iter()
            .flat_map(|project| {
                project.dependencies.iter().map(|link| ProjectDependency {
                    from_project_id: project.id.clone(),
                    to_project_id: link.target_project_id.clone(),
                    dependency_type: link.dependency_type,
                    criticality: link.criticality,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn duration_units_convert_to_days() {
        let req = ResourceRequirement {
            resource_id: "dev".into(),
            count: 2.0,
            duration: 3.0,
            unit: DurationUnit::Month,
        };
        assert_eq!(req.duration_days(), 90.0);
        assert_eq!(req.workload(), 180.0);
        assert_eq!(DurationUnit::Year.days(), 365.0);
    }

    #[test]
    fn project_duration_rounds_partial_days_up() {
        let mut p = Project::new("p", "P");
        p.start_date = Some(at(2024, 1, 1));
        p.end_date = Some(Utc.with_ymd_and_hms(2024, 1, 11, 6, 0, 0).unwrap());
        assert_eq!(p.duration_days(), 11);

        p.end_date = None;
        assert_eq!(p.duration_days(), 0);
    }

    #[test]
    fn fractional_progress_parses_and_clamps() {
        let task: Task = serde_json::from_str(r#"{ "id": "t1", "progress": 62.5 }"#).unwrap();
        assert_eq!(task.completion(), 62.5);
        assert!(!task.is_complete());

        let over: Task = serde_json::from_str(r#"{ "id": "t2", "progress": 120 }"#).unwrap();
        assert_eq!(over.completion(), 100.0);
        assert!(over.is_complete());

        let under: Task = serde_json::from_str(r#"{ "id": "t3", "progress": -5 }"#).unwrap();
        assert_eq!(under.completion(), 0.0);
    }

    #[test]
    fn inverted_window_has_zero_span() {
        let mut p = Project::new("p", "P");
        p.start_date = Some(at(2024, 2, 1));
        p.end_date = Some(at(2024, 1, 1));
        assert_eq!(p.span_days(), 0.0);
    }

    #[test]
    fn snapshot_parses_camel_case_json() {
        let json = r#"{
            "projects": [{
                "id": "p1",
                "name": "Billing",
                "factors": {"roi": 8},
                "resourceRequirements": [
                    {"resourceId": "dev", "count": 2, "duration": 3, "unit": "month"}
                ],
                "dependencies": [
                    {"targetProjectId": "p2", "dependencyType": "blocks", "criticality": "critical"}
                ],
                "status": "on_hold"
            }],
            "factorDefinitions": [{"id": "roi", "weight": 2}],
            "resourcePool": [{"id": "dev", "totalQuantity": 10}]
        }"#;
        let portfolio: Portfolio = serde_json::from_str(json).unwrap();
        let p1 = portfolio.project("p1").unwrap();
        assert_eq!(p1.status, ProjectStatus::OnHold);
        assert_eq!(p1.resource_requirements[0].unit, DurationUnit::Month);
        assert_eq!(p1.rank, None);

        let edges = portfolio.dependency_edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from_project_id, "p1");
        assert_eq!(edges[0].to_project_id, "p2");
        assert_eq!(edges[0].criticality, Criticality::Critical);
    }
}
