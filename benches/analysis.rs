//! Benchmarks for portfolio analyses.

use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pmo_engine::config::ForecastConfig;
use pmo_engine::deadline::Deadline;
use pmo_engine::dependency::DependencyGraph;
use pmo_engine::forecast::forecast_resource;
use pmo_engine::model::{
    Criticality, DependencyType, DurationUnit, Project, ProjectDependency, ResourcePoolItem,
    ResourceRequirement,
};

/// `layers` layers of `width` projects; every project blocks each project of the next layer.
fn layered_portfolio(layers: usize, width: usize) -> (Vec<Project>, Vec<ProjectDependency>) {
    let origin = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let id = |layer: usize, slot: usize| format!("p{layer}-{slot}");

    let projects = (0..layers)
        .flat_map(|layer| (0..width).map(move |slot| (layer, slot)))
        .map(|(layer, slot)| {
            let mut project = Project::new(id(layer, slot), format!("Project {layer}/{slot}"));
            project.start_date = Some(origin);
            project.end_date = Some(origin + TimeDelta::days(((layer * 7 + slot * 3) % 40 + 1) as i64));
            project
        })
        .collect();

    let mut dependencies = Vec::new();
    for layer in 1..layers {
        for from in 0..width {
            for to in 0..width {
                dependencies.push(ProjectDependency {
                    from_project_id: id(layer - 1, from),
                    to_project_id: id(layer, to),
                    dependency_type: DependencyType::Blocks,
                    criticality: Criticality::Medium,
                });
            }
        }
    }
    (projects, dependencies)
}

fn bench_critical_path(c: &mut Criterion) {
    let (projects, deps) = layered_portfolio(50, 20);
    let graph = DependencyGraph::build(&projects, &deps);

    c.bench_function("critical_path_50x20", |bench| {
        bench.iter(|| black_box(graph.critical_path(&Deadline::none()).unwrap()))
    });
}

fn bench_detect_cycles(c: &mut Criterion) {
    let (projects, deps) = layered_portfolio(50, 20);
    let graph = DependencyGraph::build(&projects, &deps);

    c.bench_function("detect_cycles_50x20", |bench| {
        bench.iter(|| black_box(graph.detect_cycles(&Deadline::none()).unwrap()))
    });
}

fn bench_forecast(c: &mut Criterion) {
    let origin = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let projects: Vec<Project> = (0..500)
        .map(|i| {
            let mut project = Project::new(format!("p{i}"), format!("Project {i}"));
            project.start_date = Some(origin + TimeDelta::days(i % 365));
            project.resource_requirements = vec![ResourceRequirement {
                resource_id: "dev".into(),
                count: (i % 5 + 1) as f64,
                duration: (i % 12 + 1) as f64,
                unit: DurationUnit::Month,
            }];
            project
        })
        .collect();
    let resource = ResourcePoolItem {
        id: "dev".into(),
        name: "Developers".into(),
        total_quantity: 400.0,
        skills: Vec::new(),
    };
    let as_of = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    let config = ForecastConfig::default();

    c.bench_function("forecast_500_projects", |bench| {
        bench.iter(|| {
            black_box(
                forecast_resource(&resource, &projects, as_of, 12, &config, &Deadline::none())
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_critical_path, bench_detect_cycles, bench_forecast);
criterion_main!(benches);
