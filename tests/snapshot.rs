//! Snapshot and configuration file tests for the PMO engine.
//!
//! These tests verify that portfolios and engine configs load from disk,
//! that synced snapshots survive a save + reload cycle, and that bad files
//! surface as the right diagnostics.

use std::path::Path;

use pmo_engine::config::EngineConfig;
use pmo_engine::engine::Engine;
use pmo_engine::error::{ConfigError, PmoError, SnapshotError};
use pmo_engine::model::Portfolio;

const PORTFOLIO: &str = r#"{
  "factorDefinitions": [
    { "id": "value", "name": "Business value", "weight": 3 },
    { "id": "risk", "name": "Delivery risk", "weight": 1 }
  ],
  "resourcePool": [
    { "id": "dev", "name": "Developers", "totalQuantity": 8, "skills": ["rust", "sql"] }
  ],
  "projects": [
    {
      "id": "crm",
      "name": "CRM migration",
      "status": "active",
      "factors": { "value": 6, "risk": 2 },
      "startDate": "2026-03-01T00:00:00Z",
      "endDate": "2026-06-01T00:00:00Z",
      "resourceRequirements": [
        { "resourceId": "dev", "count": 3, "duration": 3, "unit": "month" }
      ],
      "dependencies": [
        { "targetProjectId": "portal", "dependencyType": "blocks", "criticality": "high" }
      ]
    },
    {
      "id": "portal",
      "name": "Customer portal",
      "status": "planning",
      "factors": { "value": 9, "risk": 5 }
    }
  ]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn engine_loads_portfolio_and_config_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let portfolio = write(dir.path(), "portfolio.json", PORTFOLIO);
    let config = write(
        dir.path(),
        "pmo.toml",
        r#"
asOf = "2026-04-10"
analysisTimeoutMs = 5000

[forecast]
horizonMonths = 4
blendWeight = 0.7

[circuitBreaker]
suspendThreshold = 20000
"#,
    );

    let engine = Engine::from_files(&portfolio, Some(&config)).unwrap();
    assert_eq!(engine.config().forecast.horizon_months, 4);
    assert_eq!(engine.config().forecast.history_months, 6);
    assert_eq!(engine.config().circuit_breaker.suspend_threshold, 20_000.0);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.projects.len(), 2);
    assert_eq!(snapshot.resource_pool[0].skills, vec!["rust", "sql"]);

    let forecast = engine.forecast("dev", None).unwrap().unwrap();
    assert_eq!(forecast.predictions.len(), 4);
    assert_eq!(forecast.predictions[0].month, "2026-05");
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let portfolio = write(dir.path(), "portfolio.json", PORTFOLIO);

    let engine = Engine::from_files(&portfolio, None).unwrap();
    assert_eq!(*engine.config(), EngineConfig::default());
}

#[test]
fn synced_snapshot_survives_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = write(dir.path(), "portfolio.json", PORTFOLIO);
    let synced = dir.path().join("synced.json");

    {
        let engine = Engine::from_files(&source, None).unwrap();
        let ranking = engine.sync();
        assert_eq!(ranking[0].project_id, "portal");
        engine.save_snapshot(&synced).unwrap();
    }

    let reloaded = Portfolio::load(&synced).unwrap();
    let portal = reloaded.project("portal").unwrap();
    assert_eq!(portal.rank, Some(1));
    assert_eq!(portal.score, 8.0);
    assert_eq!(reloaded.project("crm").unwrap().rank, Some(2));
    assert_eq!(reloaded.project("crm").unwrap().score, 5.0);

    // The source file is left untouched.
    let original = Portfolio::load(&source).unwrap();
    assert_eq!(original.project("portal").unwrap().rank, None);
}

#[test]
fn missing_portfolio_is_a_read_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Engine::from_files(&dir.path().join("absent.json"), None).unwrap_err();
    assert!(matches!(err, PmoError::Snapshot(SnapshotError::Read { .. })));
}

#[test]
fn malformed_portfolio_is_a_parse_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "portfolio.json",
        r#"{ "projects": [{ "id": "x", "status": "paused" }] }"#,
    );
    let err = Portfolio::load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::Parse { .. }));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "pmo.toml", "[forecast]\nhorizon = 3\n");
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn out_of_range_config_is_invalid() {
    let dir = tempfile::TempDir::new().unwrap();
    let portfolio = write(dir.path(), "portfolio.json", PORTFOLIO);
    let config = write(dir.path(), "pmo.toml", "[forecast]\nblendWeight = -0.2\n");

    let err = Engine::from_files(&portfolio, Some(&config)).unwrap_err();
    assert!(matches!(err, PmoError::Config(ConfigError::Invalid { .. })));
}

#[test]
fn saved_config_round_trips_through_toml() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = EngineConfig::default();
    config.analysis_timeout_ms = Some(250);
    config.forecast.trend_threshold = 0.25;

    let path = write(dir.path(), "pmo.toml", &config.to_toml().unwrap());
    assert_eq!(EngineConfig::load(&path).unwrap(), config);
}
