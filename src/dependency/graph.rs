//! Portfolio dependency graph: construction, cycle detection, critical path.
//!
//! Nodes live in a petgraph arena and are addressed by `NodeIndex`; every
//! traversal runs on an explicit stack so deep or malformed graphs cannot
//! exhaust the call stack. Successors are visited in declaration order,
//! which makes cycle reports and critical-path tie-breaks deterministic.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::DependencyError;
use crate::model::{Criticality, DependencyType, Project, ProjectDependency, ProjectId};

/// Traversal steps between deadline polls.
const DEADLINE_POLL_INTERVAL: usize = 256;

/// A project as seen by the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNode {
    pub id: ProjectId,
    pub name: String,
    /// Whole days between start and end; 0 for undated or unknown projects.
    pub duration_days: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub dependency_type: DependencyType,
    pub criticality: Criticality,
}

/// Step of a critical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathProject {
    pub id: ProjectId,
    pub name: String,
    pub duration_days: u64,
}

/// The root-to-leaf chain with the greatest accumulated duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    pub path: Vec<ProjectId>,
    pub total_duration: u64,
    pub projects: Vec<PathProject>,
}

/// Directed graph of project dependencies (`from → to`).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ProjectNode, DependencyEdge>,
    index: HashMap<ProjectId, NodeIndex>,
    /// Outgoing edges per node in declaration order.
    outgoing: Vec<Vec<EdgeIndex>>,
}

impl DependencyGraph {
    /// Build the graph: one node per project in portfolio order, then one per
    /// unknown dependency endpoint, and one edge per dependency.
    pub fn build(projects: &[Project], dependencies: &[ProjectDependency]) -> Self {
        let mut g = Self::default();
        for project in projects {
            g.ensure_node(&project.id, &project.name, project.duration_days());
        }
        for dep in dependencies {
            let from = g.ensure_node(&dep.from_project_id, "", 0);
            let to = g.ensure_node(&dep.to_project_id, "", 0);
            let edge = g.graph.add_edge(
                from,
                to,
                DependencyEdge {
                    dependency_type: dep.dependency_type,
                    criticality: dep.criticality,
                },
            );
            g.outgoing[from.index()].push(edge);
        }
        tracing::debug!(
            nodes = g.graph.node_count(),
            edges = g.graph.edge_count(),
            "built dependency graph"
        );
        g
    }

    fn ensure_node(&mut self, id: &str, name: &str, duration_days: u64) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(ProjectNode {
            id: id.to_string(),
            name: name.to_string(),
            duration_days,
        });
        self.index.insert(id.to_string(), idx);
        self.outgoing.push(Vec::new());
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&ProjectNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Outgoing edges of `node` with their targets, in declaration order.
    pub(crate) fn out_edges(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &DependencyEdge)> + '_ {
        self.outgoing[node.index()].iter().filter_map(|&e| {
            let (_, target) = self.graph.edge_endpoints(e)?;
            Some((target, &self.graph[e]))
        })
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn project(&self, node: NodeIndex) -> &ProjectNode {
        &self.graph[node]
    }

    fn successor(&self, node: NodeIndex, nth: usize) -> Option<NodeIndex> {
        let edge = *self.outgoing[node.index()].get(nth)?;
        self.graph.edge_endpoints(edge).map(|(_, target)| target)
    }

    // -----------------------------------------------------------------------
    // Cycle detection
    // -----------------------------------------------------------------------

    /// Find cycles by depth-first search from every unvisited node.
    ///
    /// Each back edge to a node still on the DFS path yields one cycle: the
    /// path from that node to the current one, closed by repeating the node
    /// (`[a, b, c, a]`).
    pub fn detect_cycles(&self, deadline: &Deadline) -> Result<Vec<Vec<ProjectId>>, DependencyError> {
        let n = self.graph.node_count();
        let mut visited = vec![false; n];
        let mut path_pos: Vec<Option<usize>> = vec![None; n];
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut stack: Vec<(NodeIndex, usize)> = Vec::new();
        let mut cycles: Vec<Vec<ProjectId>> = Vec::new();
        let mut steps = 0usize;

        for start in self.graph.node_indices() {
            if visited[start.index()] {
                continue;
            }
            visited[start.index()] = true;
            path_pos[start.index()] = Some(path.len());
            path.push(start);
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                if steps % DEADLINE_POLL_INTERVAL == 0 && deadline.expired() {
                    return Err(DependencyError::DeadlineExceeded { visited: steps });
                }
                steps += 1;

                let node = frame.0;
                match self.successor(node, frame.1) {
                    Some(next) => {
                        frame.1 += 1;
                        if let Some(at) = path_pos[next.index()] {
                            let mut cycle: Vec<ProjectId> =
                                path[at..].iter().map(|&i| self.graph[i].id.clone()).collect();
                            cycle.push(self.graph[next].id.clone());
                            cycles.push(cycle);
                        } else if !visited[next.index()] {
                            visited[next.index()] = true;
                            path_pos[next.index()] = Some(path.len());
                            path.push(next);
                            stack.push((next, 0));
                        }
                    }
                    None => {
                        stack.pop();
                        path.pop();
                        path_pos[node.index()] = None;
                    }
                }
            }
        }

        if !cycles.is_empty() {
            tracing::warn!(cycles = cycles.len(), "dependency cycles detected");
        }
        Ok(cycles)
    }

    // -----------------------------------------------------------------------
    // Critical path
    // -----------------------------------------------------------------------

    /// Longest-duration path from any root (no incoming edge) to a leaf.
    ///
    /// Refuses cyclic graphs with [`DependencyError::CyclicGraph`]. Ties keep
    /// the earliest root and, below it, the earliest declared edge.
    pub fn critical_path(&self, deadline: &Deadline) -> Result<CriticalPath, DependencyError> {
        let cycles = self.detect_cycles(deadline)?;
        if !cycles.is_empty() {
            return Err(DependencyError::CyclicGraph { cycles });
        }

        let best = self.longest_from_each(deadline)?;

        let mut winner: Option<NodeIndex> = None;
        for root in self.graph.externals(Direction::Incoming) {
            let better = match winner {
                None => true,
                Some(w) => best[root.index()].0 > best[w.index()].0,
            };
            if better {
                winner = Some(root);
            }
        }

        let Some(root) = winner else {
            return Ok(CriticalPath {
                path: Vec::new(),
                total_duration: 0,
                projects: Vec::new(),
            });
        };

        let mut projects = Vec::new();
        let mut cursor = Some(root);
        while let Some(node) = cursor {
            let p = &self.graph[node];
            projects.push(PathProject {
                id: p.id.clone(),
                name: p.name.clone(),
                duration_days: p.duration_days,
            });
            cursor = best[node.index()].1;
        }

        let critical = CriticalPath {
            path: projects.iter().map(|p| p.id.clone()).collect(),
            total_duration: best[root.index()].0,
            projects,
        };
        tracing::debug!(
            length = critical.path.len(),
            total_duration = critical.total_duration,
            "critical path computed"
        );
        Ok(critical)
    }

    /// For every node: the longest accumulated duration of a path starting
    /// there, and the successor that path continues to. Requires a DAG.
    fn longest_from_each(
        &self,
        deadline: &Deadline,
    ) -> Result<Vec<(u64, Option<NodeIndex>)>, DependencyError> {
        let n = self.graph.node_count();
        let mut best: Vec<Option<(u64, Option<NodeIndex>)>> = vec![None; n];
        let mut stack: Vec<(NodeIndex, usize)> = Vec::new();
        let mut steps = 0usize;

        for start in self.graph.node_indices() {
            if best[start.index()].is_some() {
                continue;
            }
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                if steps % DEADLINE_POLL_INTERVAL == 0 && deadline.expired() {
                    return Err(DependencyError::DeadlineExceeded { visited: steps });
                }
                steps += 1;

                let node = frame.0;
                match self.successor(node, frame.1) {
                    Some(next) => {
                        frame.1 += 1;
                        if best[next.index()].is_none() {
                            stack.push((next, 0));
                        }
                    }
                    None => {
                        stack.pop();
                        let mut tail: (u64, Option<NodeIndex>) = (0, None);
                        for i in 0..self.outgoing[node.index()].len() {
                            let Some(child) = self.successor(node, i) else {
                                continue;
                            };
                            let child_total = best[child.index()].map_or(0, |b| b.0);
                            if tail.1.is_none() || child_total > tail.0 {
                                tail = (child_total, Some(child));
                            }
                        }
                        let own = self.graph[node].duration_days;
                        best[node.index()] = Some((own + tail.0, tail.1));
                    }
                }
            }
        }

        Ok(best.into_iter().map(|b| b.unwrap_or((0, None))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn dated(id: &str, days: i64) -> Project {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut p = Project::new(id, id.to_uppercase());
        p.start_date = Some(start);
        p.end_date = Some(start + Duration::days(days));
        p
    }

    fn edge(from: &str, to: &str) -> ProjectDependency {
        ProjectDependency {
            from_project_id: from.into(),
            to_project_id: to.into(),
            dependency_type: DependencyType::Blocks,
            criticality: Criticality::Medium,
        }
    }

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let projects: Vec<Project> = ids.iter().map(|id| dated(id, 1)).collect();
        let deps: Vec<ProjectDependency> = edges.iter().map(|(f, t)| edge(f, t)).collect();
        DependencyGraph::build(&projects, &deps)
    }

    #[test]
    fn ring_yields_exactly_one_cycle() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = g.detect_cycles(&Deadline::none()).unwrap();
        assert_eq!(cycles, vec![vec!["a", "b", "c", "a"]]);
    }

    #[test]
    fn diamond_has_no_cycles() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert!(g.detect_cycles(&Deadline::none()).unwrap().is_empty());
    }

    #[test]
    fn disjoint_cycles_are_all_reported() {
        let g = graph(
            &["a", "b", "x", "y", "z"],
            &[("a", "b"), ("b", "a"), ("x", "y"), ("y", "z"), ("z", "y")],
        );
        let cycles = g.detect_cycles(&Deadline::none()).unwrap();
        assert_eq!(cycles, vec![vec!["a", "b", "a"], vec!["y", "z", "y"]]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&["solo"], &[("solo", "solo")]);
        let cycles = g.detect_cycles(&Deadline::none()).unwrap();
        assert_eq!(cycles, vec![vec!["solo", "solo"]]);
    }

    #[test]
    fn unknown_endpoints_become_nodes() {
        let g = graph(&["a"], &[("a", "external")]);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node("external").map(|n| n.duration_days), Some(0));
    }

    #[test]
    fn chain_critical_path_sums_durations() {
        let projects = [dated("a", 5), dated("b", 10), dated("c", 20)];
        let deps = [edge("a", "b"), edge("b", "c")];
        let g = DependencyGraph::build(&projects, &deps);
        let cp = g.critical_path(&Deadline::none()).unwrap();
        assert_eq!(cp.total_duration, 35);
        assert_eq!(cp.path, vec!["a", "b", "c"]);
        assert_eq!(cp.projects[1].duration_days, 10);
        assert_eq!(cp.projects[2].name, "C");
    }

    #[test]
    fn critical_path_picks_the_longest_branch() {
        let projects = [
            dated("root", 2),
            dated("short", 3),
            dated("long", 9),
            dated("end", 1),
            dated("island", 11),
        ];
        let deps = [
            edge("root", "short"),
            edge("root", "long"),
            edge("short", "end"),
            edge("long", "end"),
        ];
        let cp = DependencyGraph::build(&projects, &deps)
            .critical_path(&Deadline::none())
            .unwrap();
        assert_eq!(cp.path, vec!["root", "long", "end"]);
        assert_eq!(cp.total_duration, 12);
    }

    #[test]
    fn critical_path_ties_keep_the_first_found() {
        let projects = [dated("r", 1), dated("x", 4), dated("y", 4), dated("s", 5)];
        let deps = [edge("r", "x"), edge("r", "y")];
        let cp = DependencyGraph::build(&projects, &deps)
            .critical_path(&Deadline::none())
            .unwrap();
        // r→x, r→y and the isolated s all total 5; the first root and first edge win.
        assert_eq!(cp.path, vec!["r", "x"]);
        assert_eq!(cp.total_duration, 5);
    }

    #[test]
    fn critical_path_refuses_cyclic_graphs() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        match g.critical_path(&Deadline::none()) {
            Err(DependencyError::CyclicGraph { cycles }) => {
                assert_eq!(cycles, vec![vec!["b", "c", "b"]]);
            }
            other => panic!("expected cyclic graph error, got {other:?}"),
        }
    }

    #[test]
    fn empty_graph_has_empty_critical_path() {
        let cp = DependencyGraph::default()
            .critical_path(&Deadline::none())
            .unwrap();
        assert!(cp.path.is_empty());
        assert_eq!(cp.total_duration, 0);
    }

    #[test]
    fn deep_chains_do_not_overflow_the_stack() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("p{i}")).collect();
        let projects: Vec<Project> = ids.iter().map(|id| dated(id, 1)).collect();
        let deps: Vec<ProjectDependency> = ids.windows(2).map(|w| edge(&w[0], &w[1])).collect();
        let g = DependencyGraph::build(&projects, &deps);
        let cp = g.critical_path(&Deadline::none()).unwrap();
        assert_eq!(cp.total_duration, 50_000);
        assert_eq!(cp.path.len(), 50_000);
    }

    #[test]
    fn expired_deadline_stops_traversal() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        let expired = Deadline::after(std::time::Duration::ZERO);
        assert!(matches!(
            g.detect_cycles(&expired),
            Err(DependencyError::DeadlineExceeded { .. })
        ));
        assert!(matches!(
            g.critical_path(&expired),
            Err(DependencyError::DeadlineExceeded { .. })
        ));
    }
}
