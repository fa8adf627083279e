// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # pmo-engine
//!
//! A portfolio decision engine for project management offices: it scores and
//! ranks projects, flags untraceable work, forecasts resource load, measures
//! delivery, and analyzes inter-project dependencies.
//!
//! ## Architecture
//!
//! - **Model** (`model`): Serde-backed portfolio snapshot (projects, factors, resource pool)
//! - **Scoring** (`scoring`): Weighted factor scores and dense 1..N ranking
//! - **Ghost tasks** (`ghost`): Tasks with no requirement link
//! - **Forecasting** (`forecast`): Moving average + linear trend blend per resource
//! - **Delivery** (`delivery`): Throughput, lead time, utilization and status
//! - **Dependencies** (`dependency`): petgraph-backed cycles, critical path, impact, circuit breaker
//! - **Engine** (`engine`): Snapshot-holding facade, rayon fan-out across resources and projects
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use pmo_engine::engine::Engine;
//!
//! let engine = Engine::from_files(Path::new("portfolio.json"), None).unwrap();
//! let ranking = engine.sync();
//! let path = engine.critical_path().unwrap();
//! println!("top: {:?}, critical path: {:?}", ranking.first(), path.path);
//! ```

pub mod config;
pub mod deadline;
pub mod delivery;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod ghost;
pub mod model;
pub mod scoring;
