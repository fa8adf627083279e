//! Engine facade: top-level API for the PMO decision engine.
//!
//! The `Engine` owns the configuration and the current portfolio snapshot
//! and exposes every analysis over it. Readers always see one complete
//! snapshot; `sync` replaces it as a whole.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::delivery::{self, DeliveryMetrics, DeliverySummary};
use crate::dependency::{
    CircuitBreakerDecision, CriticalPath, DependencyGraph, ImpactReport, circuit_breaker,
};
use crate::error::PmoResult;
use crate::forecast::{self, PredictionAnalysis, ResourceLoadPrediction};
use crate::ghost::{self, GhostTaskReport};
use crate::model::{Portfolio, Project, ProjectId};
use crate::scoring::{self, RankedProject};

/// The PMO portfolio decision engine.
pub struct Engine {
    config: EngineConfig,
    portfolio: RwLock<Arc<Portfolio>>,
}

impl Engine {
    /// Create an engine over an in-memory snapshot.
    pub fn new(config: EngineConfig, portfolio: Portfolio) -> PmoResult<Self> {
        config.validate()?;
        tracing::info!(
            projects = portfolio.projects.len(),
            resources = portfolio.resource_pool.len(),
            factors = portfolio.factor_definitions.len(),
            "initializing pmo engine"
        );
        Ok(Self {
            config,
            portfolio: RwLock::new(Arc::new(portfolio)),
        })
    }

    /// Load a JSON snapshot and an optional TOML config.
    pub fn from_files(portfolio_path: &Path, config_path: Option<&Path>) -> PmoResult<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let portfolio = Portfolio::load(portfolio_path)?;
        Self::new(config, portfolio)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current portfolio snapshot.
    pub fn snapshot(&self) -> Arc<Portfolio> {
        let guard = self.portfolio.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the snapshot wholesale, e.g. after reloading from disk.
    pub fn replace_portfolio(&self, portfolio: Portfolio) {
        let mut guard = self.portfolio.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(portfolio);
    }

    /// Write the current snapshot to `path` as JSON.
    pub fn save_snapshot(&self, path: &Path) -> PmoResult<()> {
        self.snapshot().save(path)?;
        Ok(())
    }

    fn deadline(&self) -> Deadline {
        Deadline::from_budget(self.config.analysis_timeout())
    }

    // -----------------------------------------------------------------------
    // Scoring and ranking
    // -----------------------------------------------------------------------

    /// Recompute all scores, then all ranks, and publish them together.
    ///
    /// Holding the write lock across the recompute keeps concurrent syncs
    /// from publishing over each other.
    pub fn sync(&self) -> Vec<RankedProject> {
        let mut guard = self.portfolio.write().unwrap_or_else(PoisonError::into_inner);
        let (next, ranking) = scoring::recompute_portfolio(&guard);
        *guard = Arc::new(next);
        drop(guard);

        tracing::info!(
            projects = ranking.len(),
            top = ranking.first().map(|r| r.project_id.as_str()).unwrap_or("-"),
            "portfolio synchronized"
        );
        ranking
    }

    // -----------------------------------------------------------------------
    // Per-project analyses
    // -----------------------------------------------------------------------

    /// Apply `f` to a project of the current snapshot; `None` for unknown ids.
    fn with_project<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&Project, &Portfolio) -> T,
    ) -> Option<T> {
        let portfolio = self.snapshot();
        let project = portfolio.project(project_id)?;
        Some(f(project, &portfolio))
    }

    pub fn ghost_tasks(&self, project_id: &str) -> Option<Vec<GhostTaskReport>> {
        self.with_project(project_id, |project, _| ghost::ghost_tasks_for_project(project))
    }

    /// Delivery metrics of one project.
    pub fn scope_metrics(&self, project_id: &str) -> Option<DeliveryMetrics> {
        self.with_project(project_id, |project, portfolio| {
            delivery::calculate(project, &portfolio.resource_pool)
        })
    }

    /// Delivery metrics of every project, in snapshot order.
    pub fn delivery_all(&self) -> Vec<DeliveryMetrics> {
        let portfolio = self.snapshot();
        portfolio
            .projects
            .par_iter()
            .map(|project| delivery::calculate(project, &portfolio.resource_pool))
            .collect()
    }

    pub fn delivery_summary(&self) -> DeliverySummary {
        delivery::portfolio_summary(&self.delivery_all())
    }

    // -----------------------------------------------------------------------
    // Forecasting
    // -----------------------------------------------------------------------

    fn horizon(&self, months: Option<u32>) -> u32 {
        months.unwrap_or(self.config.forecast.horizon_months)
    }

    /// Forecast one resource; `months` defaults to the configured horizon.
    ///
    /// `Ok(None)` when the resource is not in the pool.
    pub fn forecast(
        &self,
        resource_id: &str,
        months: Option<u32>,
    ) -> PmoResult<Option<ResourceLoadPrediction>> {
        let portfolio = self.snapshot();
        let Some(resource) = portfolio.resource(resource_id) else {
            return Ok(None);
        };
        let prediction = forecast::forecast_resource(
            resource,
            &portfolio.projects,
            self.config.as_of_date(),
            self.horizon(months),
            &self.config.forecast,
            &self.deadline(),
        )?;
        Ok(Some(prediction))
    }

    /// Forecast every pooled resource, in pool order.
    pub fn forecast_all(&self, months: Option<u32>) -> PmoResult<Vec<ResourceLoadPrediction>> {
        let portfolio = self.snapshot();
        let as_of = self.config.as_of_date();
        let months = self.horizon(months);
        let deadline = self.deadline();

        let predictions = portfolio
            .resource_pool
            .par_iter()
            .map(|resource| {
                forecast::forecast_resource(
                    resource,
                    &portfolio.projects,
                    as_of,
                    months,
                    &self.config.forecast,
                    &deadline,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(predictions)
    }

    /// Forecast every resource and summarize capacity risks.
    pub fn analyze_predictions(&self, months: Option<u32>) -> PmoResult<PredictionAnalysis> {
        let predictions = self.forecast_all(months)?;
        Ok(forecast::analyze_predictions(&predictions, &self.config.forecast))
    }

    // -----------------------------------------------------------------------
    // Dependencies
    // -----------------------------------------------------------------------

    /// Build the dependency graph of the current snapshot.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let portfolio = self.snapshot();
        DependencyGraph::build(&portfolio.projects, &portfolio.dependency_edges())
    }

    pub fn detect_cycles(&self) -> PmoResult<Vec<Vec<ProjectId>>> {
        Ok(self.dependency_graph().detect_cycles(&self.deadline())?)
    }

    pub fn critical_path(&self) -> PmoResult<CriticalPath> {
        Ok(self.dependency_graph().critical_path(&self.deadline())?)
    }

    /// Direct impact of `project_id` slipping by `delay_days`.
    pub fn analyze_impact(&self, project_id: &str, delay_days: u32) -> Vec<ImpactReport> {
        self.dependency_graph().analyze_impact(project_id, delay_days)
    }

    /// Transitive impact of `project_id` slipping by `delay_days`.
    pub fn propagate_delay(
        &self,
        project_id: &str,
        delay_days: u32,
    ) -> PmoResult<Vec<ImpactReport>> {
        Ok(self
            .dependency_graph()
            .propagate_delay(project_id, delay_days, &self.deadline())?)
    }

    /// Breaker decisions for the dependents directly blocked by `project_id`.
    ///
    /// `affected` narrows the result to a single dependent. Uses the
    /// configured suspend threshold. Unknown projects block nothing.
    pub fn circuit_breaker(
        &self,
        project_id: &str,
        affected: Option<&str>,
        delay_days: u32,
        waiting_cost_per_day: f64,
    ) -> Vec<CircuitBreakerDecision> {
        let threshold = self.config.circuit_breaker.suspend_threshold;
        self.analyze_impact(project_id, delay_days)
            .iter()
            .filter(|impact| affected.is_none_or(|id| impact.affected_project_id == id))
            .map(|impact| circuit_breaker(impact, waiting_cost_per_day, threshold))
            .collect()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let portfolio = self.snapshot();
        f.debug_struct("Engine")
            .field("projects", &portfolio.projects.len())
            .field("resources", &portfolio.resource_pool.len())
            .field("as_of", &self.config.as_of)
            .finish()
    }
}
