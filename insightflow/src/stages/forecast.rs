//! Trend projection over a detected date/value pair.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::dataset::stats::{linear_fit, round_to};
use crate::dataset::{cell_datetime, Dataset};

/// Skip reason when no date column pairs with a numeric column.
pub const NO_DATE_NUMERIC_PAIR: &str = "No date/numeric pair found";
const TARGET_HINTS: &[&str] = &["sales", "revenue", "amount", "total", "price"];
const DEFAULT_PERIODS: usize = 30;
const BAND_Z: f64 = 1.96;

/// One projected day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Day, `YYYY-MM-DD`.
    pub ds: String,
    /// Projection.
    pub yhat: f64,
    /// Lower band.
    pub yhat_lower: f64,
    /// Upper band.
    pub yhat_upper: f64,
}

/// Fragment of the forecast stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Date column used.
    pub date_column: String,
    /// Value column projected.
    pub target_column: String,
    /// Always `linear_trend`.
    pub method: String,
    /// Distinct days of history.
    pub history_points: usize,
    /// Fitted change per day.
    pub slope_per_day: f64,
    /// Projected days.
    pub forecast: Vec<ForecastPoint>,
}

/// Picks the date column and the value column to project.
#[must_use]
pub fn detect_time_series(dataset: &Dataset) -> Option<(usize, usize)> {
    let date = *dataset.date_columns().first()?;
    let numeric = dataset.numeric_columns();
    let target = numeric
        .iter()
        .copied()
        .find(|&i| {
            let name = dataset.columns()[i].to_lowercase();
            TARGET_HINTS.iter().any(|hint| name.contains(hint))
        })
        .or_else(|| numeric.first().copied())?;
    Some((date, target))
}

/// Sums the target per calendar day.
fn daily_totals(dataset: &Dataset, date: usize, target: usize) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for row in dataset.rows() {
        let (Some(day), Some(value)) = (cell_datetime(&row[date]), row[target].as_f64()) else {
            continue;
        };
        *totals.entry(day.date()).or_insert(0.0) += value;
    }
    totals
}

#[allow(clippy::cast_precision_loss)]
fn project(totals: &BTreeMap<NaiveDate, f64>, periods: usize) -> Option<(f64, Vec<ForecastPoint>)> {
    let origin = *totals.keys().next()?;
    let last = *totals.keys().next_back()?;
    let xs: Vec<f64> = totals.keys().map(|d| (*d - origin).num_days() as f64).collect();
    let ys: Vec<f64> = totals.values().copied().collect();
    let (slope, intercept) = linear_fit(&xs, &ys)?;

    let residual_ss: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let sigma = if xs.len() > 2 {
        (residual_ss / (xs.len() - 2) as f64).sqrt()
    } else {
        0.0
    };

    let points = (1..=periods)
        .filter_map(|step| {
            let day = last.checked_add_signed(Duration::days(i64::try_from(step).ok()?))?;
            let x = (day - origin).num_days() as f64;
            let yhat = slope * x + intercept;
            Some(ForecastPoint {
                ds: day.format("%Y-%m-%d").to_string(),
                yhat: round_to(yhat, 4),
                yhat_lower: round_to(yhat - BAND_Z * sigma, 4),
                yhat_upper: round_to(yhat + BAND_Z * sigma, 4),
            })
        })
        .collect();
    Some((slope, points))
}

/// Fifth stage: where the main metric is heading.
#[derive(Debug, Clone, Copy)]
pub struct ForecastStage {
    periods: usize,
}

impl Default for ForecastStage {
    fn default() -> Self {
        Self { periods: DEFAULT_PERIODS }
    }
}

impl ForecastStage {
    /// Projects 30 days.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of projected days.
    #[must_use]
    pub const fn with_periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    /// Builds the report, or the reason there is none.
    pub fn forecast(&self, dataset: &Dataset) -> Result<ForecastReport, String> {
        let (date, target) = detect_time_series(dataset).ok_or_else(|| NO_DATE_NUMERIC_PAIR.to_string())?;
        let totals = daily_totals(dataset, date, target);
        if totals.len() < 2 {
            return Err("Not enough history to forecast".to_string());
        }
        let (slope, forecast) =
            project(&totals, self.periods).ok_or_else(|| "Trend could not be fitted".to_string())?;

        Ok(ForecastReport {
            date_column: dataset.columns()[date].clone(),
            target_column: dataset.columns()[target].clone(),
            method: "linear_trend".to_string(),
            history_points: totals.len(),
            slope_per_day: round_to(slope, 6),
            forecast,
        })
    }
}

#[async_trait]
impl Stage for ForecastStage {
    fn id(&self) -> StageId {
        StageId::Forecast
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        match self.forecast(ctx.dataset()) {
            Ok(report) => {
                tracing::info!(target_column = %report.target_column, points = report.forecast.len(), "Forecast ready");
                StageResult::from_report(&report, false)
            }
            Err(reason) => {
                tracing::info!(%reason, "Forecast skipped");
                StageResult::skipped(reason)
            }
        }
    }
}
