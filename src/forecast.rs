//! Resource load forecasting: monthly demand per pool item.
//!
//! Demand is derived from project resource commitments. Each commitment
//! occupies a window starting at its project's start date and lasting its
//! duration (normalized to days), and contributes its headcount to a month in
//! proportion to how many of the month's days the window covers.
//!
//! The observed series covers the last `historyMonths` calendar months up to
//! and including the reference month. Future months are forecast by blending
//! a moving average of that series with a least-squares trend line; demand
//! already scheduled for a future month is a floor under that blend. When no
//! commitment touches the observed months, the forecaster falls back to the
//! allocation still live at the first forecast month, held flat at the lowest
//! confidence.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::deadline::Deadline;
use crate::error::ForecastError;
use crate::model::{Project, ResourceId, ResourcePoolItem, days_between};

/// Confidence lost per month of forecast horizon.
const CONFIDENCE_DECAY_PER_MONTH: f64 = 10.0;
/// Scale applied to the coefficient of variation of the history.
const VOLATILITY_PENALTY_SCALE: f64 = 50.0;
const MAX_VOLATILITY_PENALTY: f64 = 40.0;

// ---------------------------------------------------------------------------
// Calendar months
// ---------------------------------------------------------------------------

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1–12.
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month `n` months later (earlier for negative `n`).
    pub fn offset(self, n: i64) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) + n;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Midnight UTC of the first day of the month and of the next month.
    pub fn bounds(self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let next = self.offset(1);
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let end = NaiveDate::from_ymd_opt(next.year, next.month, 1)?;
        Some((
            start.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        ))
    }

    /// `YYYY-MM`.
    pub fn label(self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Direction of the fitted demand line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn from_slope(slope: f64, threshold: f64) -> Self {
        if slope > threshold {
            Self::Increasing
        } else if slope < -threshold {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

/// What a forecast was extrapolated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastBasis {
    /// Moving average blended with a trend fit over observed months.
    History,
    /// No observed demand; current commitments held flat.
    CurrentAllocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPrediction {
    /// `YYYY-MM`.
    pub month: String,
    pub predicted: f64,
    /// Demand already committed to the month by known resource windows.
    #[serde(default)]
    pub scheduled: f64,
    /// 0–100.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLoadPrediction {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub capacity: f64,
    pub predictions: Vec<MonthlyPrediction>,
    pub trend: Trend,
    pub peak_load: f64,
    pub peak_month: Option<String>,
    pub basis: ForecastBasis,
    /// Observed demand per history month, oldest first.
    pub history: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

/// One project's claim on the forecast resource.
#[derive(Debug, Clone, Copy)]
struct Commitment {
    count: f64,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Commitment {
    /// Average headcount this commitment places on `month`.
    fn load_in(&self, month: YearMonth) -> f64 {
        let (Some((start, end)), Some((m_start, m_end))) = (self.window, month.bounds()) else {
            return 0.0;
        };
        let overlap = days_between(start.max(m_start), end.min(m_end));
        let month_days = days_between(m_start, m_end);
        if month_days > 0.0 {
            self.count * overlap / month_days
        } else {
            0.0
        }
    }

    /// Whether the commitment still holds at `from`. Undated commitments always do.
    fn is_live_at(&self, from: DateTime<Utc>) -> bool {
        self.window.is_none_or(|(_, end)| end > from)
    }
}

fn commitments_for<'a>(
    resource_id: &'a str,
    projects: &'a [Project],
) -> impl Iterator<Item = Commitment> + 'a {
    projects
        .iter()
        .filter(|p| p.status.consumes_resources())
        .flat_map(move |project| {
            project
                .resource_requirements
                .iter()
                .filter(move |r| r.resource_id == resource_id)
                .map(move |r| {
                    let window = project.start_date.and_then(|start| {
                        let secs = (r.duration_days() * 86_400.0).round() as i64;
                        let end = start.checked_add_signed(TimeDelta::try_seconds(secs)?)?;
                        Some((start, end))
                    });
                    Commitment {
                        count: r.count,
                        window,
                    }
                })
        })
}

/// Forecast `months` future months of demand on `resource`.
///
/// `as_of` fixes the reference month: history ends with it and the first
/// forecast month follows it.
pub fn forecast_resource(
    resource: &ResourcePoolItem,
    projects: &[Project],
    as_of: NaiveDate,
    months: u32,
    config: &ForecastConfig,
    deadline: &Deadline,
) -> Result<ResourceLoadPrediction, ForecastError> {
    if months == 0 {
        return Err(ForecastError::InvalidHorizon { months });
    }
    let expired = || ForecastError::DeadlineExceeded {
        resource_id: resource.id.clone(),
    };

    let commitments: Vec<Commitment> = commitments_for(&resource.id, projects).collect();
    let current = YearMonth::of(as_of);
    let history_len = i64::from(config.history_months.max(1));

    let mut history = Vec::with_capacity(history_len as usize);
    for back in (0..history_len).rev() {
        if deadline.expired() {
            return Err(expired());
        }
        let month = current.offset(-back);
        history.push(commitments.iter().map(|c| c.load_in(month)).sum::<f64>());
    }

    let future: Vec<YearMonth> = (1..=i64::from(months)).map(|h| current.offset(h)).collect();
    let scheduled: Vec<f64> = future
        .iter()
        .map(|&m| commitments.iter().map(|c| c.load_in(m)).sum::<f64>())
        .collect();

    let (predictions, trend, basis) = if history.iter().all(|v| *v <= 0.0) {
        let forecast_start = future
            .first()
            .and_then(|m| m.bounds())
            .map(|(start, _)| start);
        let allocation: f64 = commitments
            .iter()
            .filter(|c| forecast_start.is_none_or(|start| c.is_live_at(start)))
            .map(|c| c.count)
            .sum::<f64>()
            .max(0.0);
        tracing::debug!(
            resource = %resource.id,
            allocation,
            "no observed demand, holding current allocation flat"
        );
        let predictions: Vec<MonthlyPrediction> = future
            .iter()
            .zip(&scheduled)
            .map(|(m, &known)| MonthlyPrediction {
                month: m.label(),
                predicted: round_to(allocation.max(known), 2),
                scheduled: round_to(known, 2),
                confidence: config.confidence_floor,
            })
            .collect();
        (predictions, Trend::Stable, ForecastBasis::CurrentAllocation)
    } else {
        let fit = LinearFit::of(&history);
        let ma = moving_average(&history, config.moving_average_window);
        let penalty = (coefficient_of_variation(&history) * VOLATILITY_PENALTY_SCALE)
            .min(MAX_VOLATILITY_PENALTY);
        let last_x = (history.len() - 1) as f64;

        let mut predictions = Vec::with_capacity(future.len());
        for (i, month) in future.iter().enumerate() {
            if deadline.expired() {
                return Err(expired());
            }
            let ahead = (i + 1) as f64;
            let trend_value = fit.at(last_x + ahead);
            let blended =
                config.blend_weight * ma + (1.0 - config.blend_weight) * trend_value;
            // Committed demand is a floor under the extrapolation.
            let known = scheduled[i];
            let confidence = (100.0 - CONFIDENCE_DECAY_PER_MONTH * ahead - penalty)
                .max(config.confidence_floor);
            predictions.push(MonthlyPrediction {
                month: month.label(),
                predicted: round_to(blended.max(known).max(0.0), 2),
                scheduled: round_to(known, 2),
                confidence: round_to(confidence, 1),
            });
        }
        let trend = Trend::from_slope(fit.slope, config.trend_threshold);
        (predictions, trend, ForecastBasis::History)
    };

    let (peak_load, peak_month) = peak(&predictions);
    if peak_load > resource.total_quantity {
        tracing::warn!(
            resource = %resource.id,
            peak_load,
            capacity = resource.total_quantity,
            peak_month = peak_month.as_deref().unwrap_or_default(),
            "forecast demand exceeds capacity"
        );
    }

    Ok(ResourceLoadPrediction {
        resource_id: resource.id.clone(),
        resource_name: resource.name.clone(),
        capacity: resource.total_quantity,
        predictions,
        trend,
        peak_load,
        peak_month,
        basis,
        history,
    })
}

/// Highest prediction and its month; the earliest month wins ties.
fn peak(predictions: &[MonthlyPrediction]) -> (f64, Option<String>) {
    predictions
        .iter()
        .fold((0.0, None), |(best, month), p| match month {
            Some(_) if p.predicted <= best => (best, month),
            _ => (p.predicted, Some(p.month.clone())),
        })
}

/// Least-squares line over `values[x]` at `x = 0, 1, ...`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearFit {
    slope: f64,
    intercept: f64,
}

impl LinearFit {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        if values.is_empty() {
            return Self {
                slope: 0.0,
                intercept: 0.0,
            };
        }
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;
        let (sxy, sxx) = values
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
                let dx = x as f64 - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }

    fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

fn moving_average(values: &[f64], window: usize) -> f64 {
    let window = window.clamp(1, values.len().max(1));
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}

/// Standard deviation over mean; 0 when the mean is 0.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Portfolio analysis
// ---------------------------------------------------------------------------

/// A forecast month where demand exceeds capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadWarning {
    pub resource_id: ResourceId,
    pub month: String,
    pub predicted: f64,
    pub capacity: f64,
    /// Units of demand above capacity.
    pub excess: f64,
}

/// A resource whose forecast stays well below capacity for the whole horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationOpportunity {
    pub resource_id: ResourceId,
    /// Mean predicted demand over capacity, in percent.
    pub average_utilization: f64,
    /// Capacity left over at the forecast peak.
    pub spare_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionAnalysis {
    pub summary: String,
    /// Most severe first.
    pub warnings: Vec<LoadWarning>,
    /// Least utilized first.
    pub opportunities: Vec<UtilizationOpportunity>,
}

/// Collect overload warnings and low-utilization opportunities across resources.
pub fn analyze_predictions(
    predictions: &[ResourceLoadPrediction],
    config: &ForecastConfig,
) -> PredictionAnalysis {
    let mut warnings: Vec<LoadWarning> = predictions
        .iter()
        .flat_map(|forecast| {
            forecast
                .predictions
                .iter()
                .filter(|p| p.predicted > forecast.capacity)
                .map(|p| LoadWarning {
                    resource_id: forecast.resource_id.clone(),
                    month: p.month.clone(),
                    predicted: p.predicted,
                    capacity: forecast.capacity,
                    excess: round_to(p.predicted - forecast.capacity, 2),
                })
        })
        .collect();
    warnings.sort_by(|a, b| {
        b.excess
            .total_cmp(&a.excess)
            .then_with(|| a.month.cmp(&b.month))
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });

    let mut opportunities: Vec<UtilizationOpportunity> = predictions
        .iter()
        .filter(|f| f.capacity > 0.0 && !f.predictions.is_empty())
        .filter(|f| {
            let ceiling = config.low_utilization_ratio * f.capacity;
            f.predictions.iter().all(|p| p.predicted < ceiling)
        })
        .map(|f| {
            let mean = f.predictions.iter().map(|p| p.predicted).sum::<f64>()
                / f.predictions.len() as f64;
            UtilizationOpportunity {
                resource_id: f.resource_id.clone(),
                average_utilization: round_to(mean / f.capacity * 100.0, 1),
                spare_capacity: round_to(f.capacity - f.peak_load, 2),
            }
        })
        .collect();
    opportunities.sort_by(|a, b| {
        a.average_utilization
            .total_cmp(&b.average_utilization)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });

    let overloaded: BTreeSet<&str> = warnings.iter().map(|w| w.resource_id.as_str()).collect();
    let summary = if warnings.is_empty() && opportunities.is_empty() {
        format!(
            "{} resource(s) analyzed: no capacity risks detected",
            predictions.len()
        )
    } else {
        format!(
            "{} resource(s) analyzed: {} overload warning(s) across {} resource(s), {} underutilized resource(s)",
            predictions.len(),
            warnings.len(),
            overloaded.len(),
            opportunities.len()
        )
    };

    PredictionAnalysis {
        summary,
        warnings,
        opportunities,
    }
}
