//! Inter-project dependency analysis.
//!
//! - [`graph`]: arena-backed graph, cycle detection and critical path
//! - [`impact`]: delay impact, transitive propagation and the circuit breaker

pub mod graph;
pub mod impact;

pub use graph::{CriticalPath, DependencyEdge, DependencyGraph, PathProject, ProjectNode};
pub use impact::{
    BreakerAction, BreakerRecommendation, CircuitBreakerDecision, ImpactReport, Recommendation,
    RiskLevel, circuit_breaker,
};
