//! Weighted priority scoring and dense ranking of portfolio projects.
//!
//! A project's score is the weighted average of its factor values over every
//! factor definition in the portfolio. Factors a project leaves unset count as
//! zero, so incomplete assessments are diluted rather than rejected. Ranks are
//! a dense permutation `1..=N`, descending by score, with equal scores ordered
//! by project id so repeated syncs are stable.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{FactorDefinition, FactorId, Portfolio, ProjectId};

/// Score and rank of one project after a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProject {
    pub project_id: ProjectId,
    pub score: f64,
    pub rank: u32,
}

/// Weighted average of `factors` over `definitions`.
///
/// Returns 0 when the total weight is 0. The result lies in `[0, 10]`
/// whenever every factor value does.
pub fn score_project(factors: &HashMap<FactorId, f64>, definitions: &[FactorDefinition]) -> f64 {
    let (total_score, total_weight) =
        definitions
            .iter()
            .fold((0.0_f64, 0.0_f64), |(score, weight), def| {
                let value = factors.get(&def.id).copied().unwrap_or(0.0);
                (score + value * def.weight, weight + def.weight)
            });

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.0
    }
}

/// Order projects by score (descending, ties by id ascending) and number them from 1.
pub fn assign_ranks<'a>(scores: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<RankedProject> {
    let mut ordered: Vec<(&str, f64)> = scores.into_iter().collect();
    ordered.sort_by(|a, b| rank_order(a, b));

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (id, score))| RankedProject {
            project_id: id.to_string(),
            score,
            rank: i as u32 + 1,
        })
        .collect()
}

fn rank_order(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Recompute every score, then every rank, and return the updated snapshot.
///
/// The input is never mutated; the caller swaps the returned snapshot in
/// as a whole so readers never pair scores of one sync with ranks of another.
pub fn recompute_portfolio(portfolio: &Portfolio) -> (Portfolio, Vec<RankedProject>) {
    let mut next = portfolio.clone();

    for project in &mut next.projects {
        project.score = score_project(&project.factors, &portfolio.factor_definitions);
    }

    let ranking = assign_ranks(next.projects.iter().map(|p| (p.id.as_str(), p.score)));
    let ranks: HashMap<&str, u32> = ranking
        .iter()
        .map(|r| (r.project_id.as_str(), r.rank))
        .collect();
    for project in &mut next.projects {
        project.rank = ranks.get(project.id.as_str()).copied();
    }

    tracing::debug!(projects = ranking.len(), "recomputed portfolio scores and ranks");
    (next, ranking)
}
