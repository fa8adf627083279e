//! Ghost-task detection: work with no traceable requirement.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Project, Requirement, Task, TaskId};

/// Why a task was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostReason {
    /// No requirement lists the task among its related tasks.
    NoRequirementLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostTaskReport {
    pub task_id: TaskId,
    pub task_name: String,
    pub reason: GhostReason,
}

/// Report every task not covered by any requirement, in task order.
///
/// With no requirements at all, every task is a ghost.
pub fn detect_ghost_tasks<'a>(
    tasks: &[Task],
    requirements: impl IntoIterator<Item = &'a Requirement>,
) -> Vec<GhostTaskReport> {
    let linked: HashSet<&str> = requirements
        .into_iter()
        .flat_map(|req| req.related_task_ids.iter().map(String::as_str))
        .collect();

    tasks
        .iter()
        .filter(|task| !linked.contains(task.id.as_str()))
        .map(|task| GhostTaskReport {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            reason: GhostReason::NoRequirementLink,
        })
        .collect()
}

/// Ghost tasks of one project, counting only requirements that belong to it.
pub fn ghost_tasks_for_project(project: &Project) -> Vec<GhostTaskReport> {
    let own = project
        .requirements
        .iter()
        .filter(|req| req.project_id == project.id);
    let ghosts = detect_ghost_tasks(&project.tasks, own);
    if !ghosts.is_empty() {
        tracing::debug!(
            project = %project.id,
            ghosts = ghosts.len(),
            tasks = project.tasks.len(),
            "ghost tasks detected"
        );
    }
    ghosts
}
