//! Buy-and-hold backtest of a weighted mix of instruments.
//!
//! Each included series is restricted to the requested window and aligned on
//! the dates every series has in common. The portfolio's daily return is the
//! weight-sum of the instruments' simple daily returns, compounded from 1.0.
//! Weight belonging to excluded instruments earns nothing, like idle cash.

use super::allocator::AllocationWeights;
use super::category::AssetCategory;
use super::error::{InstrumentWarning, PlanError};
use super::instrument::Instrument;
use super::series::PriceSeries;
use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub const DEFAULT_NOTIONAL: f64 = 1000.0;

/// Spans shorter than this are not annualized.
const MIN_CAGR_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BacktestWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PlanError> {
        if start > end {
            return Err(PlanError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }
}

/// One instrument's history and its weight as a fraction of the portfolio.
#[derive(Debug, Clone)]
pub struct WeightedSeries {
    pub name: String,
    pub weight: f64,
    pub series: PriceSeries,
}

/// Splits each category's weight evenly over its instruments. Weights are
/// returned as fractions of the whole portfolio.
pub fn instrument_weights<'a>(
    weights: &AllocationWeights,
    instruments: &[&'a Instrument],
) -> Vec<(&'a Instrument, f64)> {
    let mut per_category: BTreeMap<AssetCategory, usize> = BTreeMap::new();
    for instrument in instruments {
        *per_category.entry(instrument.category).or_insert(0) += 1;
    }

    instruments
        .iter()
        .map(|instrument| {
            let count = per_category[&instrument.category] as f64;
            let weight = weights.get(instrument.category) / 100.0 / count;
            (*instrument, weight)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub curve: Vec<(NaiveDate, f64)>,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub notional: f64,
    pub ending_value: f64,
    /// Annualized growth over the covered calendar span, in percent. Only
    /// set for spans of a year or more.
    pub cagr_pct: Option<f64>,
    /// Largest peak-to-trough fall of the curve, in percent.
    pub max_drawdown_pct: f64,
    pub included: Vec<String>,
    pub excluded: Vec<InstrumentWarning>,
}

impl BacktestReport {
    pub fn start(&self) -> Option<NaiveDate> {
        self.curve.first().map(|(d, _)| *d)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.curve.last().map(|(d, _)| *d)
    }
}

/// Runs the backtest. Empty series are excluded and reported; an empty date
/// intersection yields [`PlanError::InsufficientData`].
pub fn run_backtest(
    inputs: &[WeightedSeries],
    window: BacktestWindow,
    notional: f64,
) -> Result<BacktestReport, PlanError> {
    if !notional.is_finite() || notional <= 0.0 {
        return Err(PlanError::InvalidInput(format!(
            "notional must be positive, got {notional}"
        )));
    }
    if inputs.is_empty() {
        return Err(PlanError::EmptySelection(
            "choose at least one instrument to backtest".to_string(),
        ));
    }

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for input in inputs {
        let restricted = input.series.restrict(window.start, window.end);
        if restricted.is_empty() {
            warn!(instrument = %input.name, "No price history in window; excluded");
            excluded.push(InstrumentWarning::new(
                &input.name,
                format!("no price history between {} and {}", window.start, window.end),
            ));
        } else {
            included.push((input, restricted));
        }
    }

    let Some(((_, first), rest)) = included.split_first() else {
        return Err(insufficient_data(&excluded));
    };
    let mut common: BTreeSet<NaiveDate> = first.points().iter().map(|p| p.date).collect();
    for (_, series) in rest {
        let dates: BTreeSet<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        common = common.intersection(&dates).copied().collect();
    }
    if common.is_empty() {
        return Err(insufficient_data(&excluded));
    }
    let dates: Vec<NaiveDate> = common.into_iter().collect();
    debug!(
        "Aligned {} series on {} common dates",
        included.len(),
        dates.len()
    );

    let aligned: Vec<(f64, Vec<f64>)> = included
        .iter()
        .map(|(input, series)| {
            let prices = dates
                .iter()
                .filter_map(|d| series.price_on(*d))
                .collect::<Vec<_>>();
            (input.weight, prices)
        })
        .collect();

    let mut curve = Vec::with_capacity(dates.len());
    let mut cumulative = 1.0;
    curve.push((dates[0], cumulative));
    for t in 1..dates.len() {
        let daily: f64 = aligned
            .iter()
            .map(|(weight, prices)| weight * (prices[t] / prices[t - 1] - 1.0))
            .sum();
        cumulative *= 1.0 + daily;
        curve.push((dates[t], cumulative));
    }

    let span_days = (dates[dates.len() - 1] - dates[0]).num_days();
    let cagr_pct = if span_days >= MIN_CAGR_DAYS {
        annualized_pct(cumulative, span_days as f64 / 365.0)
            .map_err(|e| debug!("CAGR unavailable: {e}"))
            .ok()
    } else {
        None
    };

    Ok(BacktestReport {
        final_value: cumulative,
        total_return_pct: (cumulative - 1.0) * 100.0,
        notional,
        ending_value: notional * cumulative,
        cagr_pct,
        max_drawdown_pct: max_drawdown_pct(&curve),
        curve,
        included: included.iter().map(|(i, _)| i.name.clone()).collect(),
        excluded,
    })
}

fn insufficient_data(excluded: &[InstrumentWarning]) -> PlanError {
    PlanError::InsufficientData {
        excluded: excluded.iter().map(|w| w.instrument.clone()).collect(),
    }
}

fn annualized_pct(growth: f64, years: f64) -> anyhow::Result<f64> {
    let begin_bal = Decimal::ONE;
    let end_bal = Decimal::from_f64(growth).ok_or_else(|| anyhow!("Invalid ending value"))?;
    let n_years = Decimal::from_f64(years).ok_or_else(|| anyhow!("Invalid duration"))?;
    if n_years.is_zero() {
        return Err(anyhow!("Zero duration"));
    }
    let rate = cagr(begin_bal, end_bal, n_years);
    (rate * Decimal::from(100))
        .to_f64()
        .ok_or_else(|| anyhow!("CAGR percentage conversion failed"))
}

fn max_drawdown_pct(curve: &[(NaiveDate, f64)]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for (_, value) in curve {
        peak = peak.max(*value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak * 100.0);
        }
    }
    worst
}
