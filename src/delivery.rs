//! Delivery-efficiency metrics and health classification per project.
//!
//! All ratios are guarded: zero tasks, zero capacity and missing dates produce
//! well-defined values instead of NaN. The status thresholds below are shared
//! with existing dashboards and must not drift.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Project, ResourcePoolItem, Task};

/// Utilization (percent) above which a project is critical.
pub const CRITICAL_UTILIZATION: f64 = 95.0;
/// Lead time (days) above which a project is critical.
pub const CRITICAL_LEAD_TIME: f64 = 60.0;
pub const WARNING_UTILIZATION: f64 = 85.0;
pub const WARNING_LEAD_TIME: f64 = 45.0;
/// Completed tasks per week a project must exceed to count as efficient.
pub const EFFICIENT_THROUGHPUT: f64 = 5.0;
/// Inclusive utilization band of an efficient project.
pub const EFFICIENT_UTILIZATION: (f64, f64) = (70.0, 85.0);

/// Workload (person-days) below which a project is small.
pub const SMALL_PROJECT_WORKLOAD: f64 = 100.0;
pub const MEDIUM_PROJECT_WORKLOAD: f64 = 500.0;

/// Health of a project's delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Critical,
    Warning,
    Efficient,
    Normal,
}

impl DeliveryStatus {
    /// Classify from the three driving metrics, most severe rule first.
    pub fn classify(throughput: f64, lead_time: f64, utilization: f64) -> Self {
        if utilization > CRITICAL_UTILIZATION || lead_time > CRITICAL_LEAD_TIME {
            Self::Critical
        } else if utilization > WARNING_UTILIZATION || lead_time > WARNING_LEAD_TIME {
            Self::Warning
        } else if throughput > EFFICIENT_THROUGHPUT
            && (EFFICIENT_UTILIZATION.0..=EFFICIENT_UTILIZATION.1).contains(&utilization)
        {
            Self::Efficient
        } else {
            Self::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Efficient => "efficient",
            Self::Normal => "normal",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Size bucket by total person-day workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSize {
    Small,
    Medium,
    Large,
}

impl ProjectSize {
    pub fn from_workload(workload: f64) -> Self {
        if workload < SMALL_PROJECT_WORKLOAD {
            Self::Small
        } else if workload < MEDIUM_PROJECT_WORKLOAD {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMetrics {
    pub project_id: String,
    /// Completed tasks per week.
    pub throughput: f64,
    /// Extrapolated days to 100% completion.
    pub lead_time: f64,
    /// Average person-day workload per task.
    pub granularity: f64,
    /// Requested units over matched pool capacity, in percent.
    pub resource_utilization: f64,
    pub project_size: ProjectSize,
    pub status: DeliveryStatus,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Sum of requested resource units.
    pub resource_count: f64,
    pub duration_days: u64,
}

/// Compute delivery metrics for one project against the resource pool.
pub fn calculate(project: &Project, pool: &[ResourcePoolItem]) -> DeliveryMetrics {
    let duration_days = project.duration_days().max(1);
    let duration_weeks = (duration_days as f64 / 7.0).max(1.0);

    let total_tasks = project.tasks.len();
    let completed_tasks = project.tasks.iter().filter(|t| t.is_complete()).count();
    let throughput = completed_tasks as f64 / duration_weeks;

    let avg_progress = if total_tasks > 0 {
        project.tasks.iter().map(Task::completion).sum::<f64>() / total_tasks as f64
    } else {
        0.0
    };
    let lead_time = if avg_progress > 0.0 {
        duration_days as f64 / (avg_progress / 100.0)
    } else {
        duration_days as f64
    };

    let total_workload: f64 = project
        .resource_requirements
        .iter()
        .map(|r| r.workload())
        .sum();
    let granularity = if total_tasks > 0 {
        total_workload / total_tasks as f64
    } else {
        total_workload
    };

    let resource_count: f64 = project.resource_requirements.iter().map(|r| r.count).sum();
    let resource_utilization = utilization(project, pool, resource_count);

    let status = DeliveryStatus::classify(throughput, lead_time, resource_utilization);
    tracing::debug!(
        project = %project.id,
        throughput,
        lead_time,
        utilization = resource_utilization,
        %status,
        "delivery metrics"
    );

    DeliveryMetrics {
        project_id: project.id.clone(),
        throughput,
        lead_time,
        granularity,
        resource_utilization,
        project_size: ProjectSize::from_workload(total_workload),
        status,
        total_tasks,
        completed_tasks,
        resource_count,
        duration_days,
    }
}

/// Requested units over the capacity of every distinct pool item the project
/// references, in percent. Unmatched resources add demand but no capacity.
fn utilization(project: &Project, pool: &[ResourcePoolItem], requested: f64) -> f64 {
    let referenced: HashSet<&str> = project
        .resource_requirements
        .iter()
        .map(|r| r.resource_id.as_str())
        .collect();
    let capacity: f64 = pool
        .iter()
        .filter(|item| referenced.contains(item.id.as_str()))
        .map(|item| item.total_quantity)
        .sum();

    if capacity > 0.0 {
        requested / capacity * 100.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Portfolio summary
// ---------------------------------------------------------------------------

/// Portfolio-wide roll-up of per-project delivery metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub project_count: usize,
    pub critical: usize,
    pub warning: usize,
    pub efficient: usize,
    pub normal: usize,
    pub mean_throughput: f64,
    pub mean_utilization: f64,
    /// 85th-percentile lead time (nearest rank).
    pub p85_lead_time: f64,
}

pub fn portfolio_summary(metrics: &[DeliveryMetrics]) -> DeliverySummary {
    let count_of = |status: DeliveryStatus| metrics.iter().filter(|m| m.status == status).count();
    let mean = |f: fn(&DeliveryMetrics) -> f64| {
        if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(f).sum::<f64>() / metrics.len() as f64
        }
    };

    let lead_times: Vec<f64> = metrics.iter().map(|m| m.lead_time).collect();

    DeliverySummary {
        project_count: metrics.len(),
        critical: count_of(DeliveryStatus::Critical),
        warning: count_of(DeliveryStatus::Warning),
        efficient: count_of(DeliveryStatus::Efficient),
        normal: count_of(DeliveryStatus::Normal),
        mean_throughput: mean(|m| m.throughput),
        mean_utilization: mean(|m| m.resource_utilization),
        p85_lead_time: percentile(lead_times, 85.0),
    }
}

/// Nearest-rank percentile; 0 for an empty sample.
pub fn percentile(mut values: Vec<f64>, pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let rank = ((pct / 100.0) * values.len() as f64).ceil() as usize;
    values[rank.clamp(1, values.len()) - 1]
}
