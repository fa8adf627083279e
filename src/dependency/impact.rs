//! Delay impact along `blocks` dependencies and the waiting-cost circuit breaker.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::DependencyError;
use crate::model::{Criticality, DependencyType, ProjectId};

use super::graph::DependencyGraph;

/// Delay (days) beyond which any blocked dependent is high risk.
pub const HIGH_RISK_DELAY_DAYS: u32 = 30;
/// Delay (days) beyond which any blocked dependent is at least medium risk.
pub const MEDIUM_RISK_DELAY_DAYS: u32 = 14;

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Risk to a dependent blocked by a project slipping `delay_days`.
    pub fn assess(criticality: Criticality, delay_days: u32) -> Self {
        if criticality == Criticality::Critical || delay_days > HIGH_RISK_DELAY_DAYS {
            Self::High
        } else if criticality == Criticality::High || delay_days > MEDIUM_RISK_DELAY_DAYS {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            Self::High => Recommendation::Suspend,
            Self::Medium => Recommendation::Reschedule,
            Self::Low => Recommendation::Monitor,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// What to do about a blocked dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Suspend,
    Reschedule,
    Monitor,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Suspend => {
                "Consider suspending the dependent project until the blocker recovers; evaluate the waiting cost with the circuit breaker."
            }
            Self::Reschedule => {
                "Reschedule the dependent project's affected milestones and notify its stakeholders."
            }
            Self::Monitor => "Monitor the delay; no schedule change is needed yet.",
        }
    }
}

// ---------------------------------------------------------------------------
// Impact analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    /// Project whose blocker slipped.
    pub affected_project_id: ProjectId,
    /// Project that blocks it.
    pub blocked_by: ProjectId,
    pub delay_days: u32,
    pub criticality: Criticality,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub message: String,
    /// Number of `blocks` hops from the delayed project.
    pub distance: usize,
}

impl ImpactReport {
    fn new(
        affected: &str,
        blocked_by: &str,
        delay_days: u32,
        criticality: Criticality,
        distance: usize,
    ) -> Self {
        let risk_level = RiskLevel::assess(criticality, delay_days);
        let recommendation = risk_level.recommendation();
        Self {
            affected_project_id: affected.to_string(),
            blocked_by: blocked_by.to_string(),
            delay_days,
            criticality,
            risk_level,
            recommendation,
            message: recommendation.message().to_string(),
            distance,
        }
    }
}

impl DependencyGraph {
    /// Impact on every project directly blocked by `project_id`.
    ///
    /// Unknown projects and projects that block nothing yield an empty list.
    pub fn analyze_impact(&self, project_id: &str, delay_days: u32) -> Vec<ImpactReport> {
        let Some(source) = self.index_of(project_id) else {
            return Vec::new();
        };
        self.out_edges(source)
            .filter(|(_, edge)| edge.dependency_type == DependencyType::Blocks)
            .map(|(target, edge)| {
                ImpactReport::new(
                    &self.project(target).id,
                    project_id,
                    delay_days,
                    edge.criticality,
                    1,
                )
            })
            .collect()
    }

    /// Impact on every project transitively blocked by `project_id`.
    ///
    /// Breadth-first over `blocks` edges; each project is reported once, at
    /// its shortest distance, with the criticality of the edge that reached it.
    /// The full delay is assumed to carry through the chain.
    pub fn propagate_delay(
        &self,
        project_id: &str,
        delay_days: u32,
        deadline: &Deadline,
    ) -> Result<Vec<ImpactReport>, DependencyError> {
        let Some(source) = self.index_of(project_id) else {
            return Ok(Vec::new());
        };

        let mut seen = vec![false; self.node_count()];
        seen[source.index()] = true;
        let mut queue = VecDeque::from([(source, 0usize)]);
        let mut reports = Vec::new();

        while let Some((node, distance)) = queue.pop_front() {
            if deadline.expired() {
                return Err(DependencyError::DeadlineExceeded {
                    visited: reports.len(),
                });
            }
            for (target, edge) in self.out_edges(node) {
                if edge.dependency_type != DependencyType::Blocks || seen[target.index()] {
                    continue;
                }
                seen[target.index()] = true;
                reports.push(ImpactReport::new(
                    &self.project(target).id,
                    &self.project(node).id,
                    delay_days,
                    edge.criticality,
                    distance + 1,
                ));
                queue.push_back((target, distance + 1));
            }
        }

        tracing::debug!(
            project = project_id,
            delay_days,
            affected = reports.len(),
            "delay propagated"
        );
        Ok(reports)
    }
}

// ---------------------------------------------------------------------------
// Circuit breaker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerAction {
    Suspend,
    ContinueWaiting,
}

/// Machine-readable reasoning behind a breaker decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerRecommendation {
    pub action: BreakerAction,
    pub risk_level: RiskLevel,
    pub threshold: f64,
    pub threshold_exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerDecision {
    pub affected_project_id: ProjectId,
    pub should_suspend: bool,
    pub total_waiting_cost: f64,
    /// Waiting cost avoided by suspending; 0 when waiting is recommended.
    pub estimated_savings: f64,
    pub recommendation: BreakerRecommendation,
}

/// Suspend the dependent when waiting costs more than `threshold` and the
/// impact is high risk; otherwise keep waiting.
pub fn circuit_breaker(
    impact: &ImpactReport,
    waiting_cost_per_day: f64,
    threshold: f64,
) -> CircuitBreakerDecision {
    let total_waiting_cost = f64::from(impact.delay_days) * waiting_cost_per_day;
    let threshold_exceeded = total_waiting_cost > threshold;
    let should_suspend = threshold_exceeded && impact.risk_level == RiskLevel::High;

    if should_suspend {
        tracing::info!(
            project = %impact.affected_project_id,
            total_waiting_cost,
            threshold,
            "circuit breaker recommends suspension"
        );
    }

    CircuitBreakerDecision {
        affected_project_id: impact.affected_project_id.clone(),
        should_suspend,
        total_waiting_cost,
        estimated_savings: if should_suspend { total_waiting_cost } else { 0.0 },
        recommendation: BreakerRecommendation {
            action: if should_suspend {
                BreakerAction::Suspend
            } else {
                BreakerAction::ContinueWaiting
            },
            risk_level: impact.risk_level,
            threshold,
            threshold_exceeded,
        },
    }
}
