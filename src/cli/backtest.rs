use super::ui;
use crate::core::backtest::{
    BacktestReport, BacktestWindow, WeightedSeries, instrument_weights, run_backtest,
};
use crate::core::{
    AllocationModel, Instrument, InstrumentRegistry, InstrumentWarning, PlanError, PlanRequest,
    PriceProvider, PriceSeries, PriceWindow,
};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use comfy_table::Cell;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

const CURVE_ROWS: usize = 12;

/// Calendar dates covered by `span`, ending today for trailing periods.
pub(crate) fn resolve_window(span: PriceWindow, today: NaiveDate) -> Result<BacktestWindow, PlanError> {
    match span {
        PriceWindow::Trailing(period) => BacktestWindow::new(today - period.to_duration(), today),
        PriceWindow::Range { start, end } => BacktestWindow::new(start, end),
    }
}

pub async fn run(
    request: &PlanRequest,
    span: PriceWindow,
    notional: f64,
    registry: &InstrumentRegistry,
    model: &AllocationModel,
    provider: &(dyn PriceProvider + Send + Sync),
    currency: &str,
) -> Result<()> {
    let window = match resolve_window(span, Local::now().date_naive()) {
        Ok(window) => window,
        Err(e) => return super::report_plan_error(e),
    };
    let weights = match model.allocate(request.risk(), request.categories()) {
        Ok(weights) => weights,
        Err(e) => return super::report_plan_error(e),
    };
    let chosen = match request.resolve_instruments(registry) {
        Ok(chosen) => chosen,
        Err(e) => return super::report_plan_error(e),
    };
    info!(%span, start = %window.start, end = %window.end, "Running backtest");

    let mut idle = Vec::new();
    for (category, weight) in weights.nonzero() {
        if !chosen.contains_key(&category) {
            idle.push(InstrumentWarning::new(
                category.to_string(),
                format!("{weight:.2}% held as cash, no instruments chosen"),
            ));
        }
    }

    let instruments: Vec<&Instrument> = chosen
        .iter()
        .filter(|(category, _)| weights.get(**category) > 0.0)
        .flat_map(|(_, members)| members.iter().copied())
        .collect();
    let tickers: BTreeSet<String> = instruments
        .iter()
        .filter_map(|i| i.ticker.clone())
        .collect();
    let history = super::fetch_all_series(provider, &tickers, span).await;

    let (inputs, fetch_failures) = weighted_inputs(&instrument_weights(&weights, &instruments), &history);

    match run_backtest(&inputs, window, notional) {
        Ok(report) => {
            println!("{}", summary(&report, currency));
            println!("\n{}", curve_table(&report));
            super::print_warnings("Cash drag:", &idle);
            super::print_warnings("Excluded:", &explain_exclusions(&report.excluded, &fetch_failures));
            Ok(())
        }
        Err(PlanError::InsufficientData { excluded }) => {
            super::print_warnings(
                "Excluded:",
                &excluded
                    .iter()
                    .map(|name| {
                        InstrumentWarning::new(
                            name,
                            fetch_failures
                                .get(name)
                                .cloned()
                                .unwrap_or_else(|| "no price history in window".to_string()),
                        )
                    })
                    .collect::<Vec<_>>(),
            );
            super::report_plan_error(PlanError::InsufficientData { excluded })
        }
        Err(e) => super::report_plan_error(e),
    }
}

/// Pairs each weighted instrument with its fetched history. Instruments with
/// no usable history get an empty series and a recorded reason.
pub(crate) fn weighted_inputs(
    weighted: &[(&Instrument, f64)],
    history: &HashMap<String, Result<PriceSeries>>,
) -> (Vec<WeightedSeries>, HashMap<String, String>) {
    let mut failures = HashMap::new();
    let inputs = weighted
        .iter()
        .map(|(instrument, weight)| {
            let series = match &instrument.ticker {
                None => {
                    failures.insert(
                        instrument.name.clone(),
                        "no market price (manual product)".to_string(),
                    );
                    PriceSeries::empty()
                }
                Some(ticker) => match history.get(ticker) {
                    Some(Ok(series)) => series.clone(),
                    Some(Err(e)) => {
                        debug!("History fetch error for {}: {}", ticker, e);
                        failures.insert(instrument.name.clone(), e.to_string());
                        PriceSeries::empty()
                    }
                    None => {
                        failures.insert(instrument.name.clone(), "history not fetched".to_string());
                        PriceSeries::empty()
                    }
                },
            };
            WeightedSeries {
                name: instrument.name.clone(),
                weight: *weight,
                series,
            }
        })
        .collect();
    (inputs, failures)
}

fn explain_exclusions(
    excluded: &[InstrumentWarning],
    failures: &HashMap<String, String>,
) -> Vec<InstrumentWarning> {
    excluded
        .iter()
        .map(|w| match failures.get(&w.instrument) {
            Some(reason) => InstrumentWarning::new(&w.instrument, reason),
            None => w.clone(),
        })
        .collect()
}

pub(crate) fn summary(report: &BacktestReport, currency: &str) -> String {
    let period = match (report.start(), report.end()) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "N/A".to_string(),
    };
    let cagr = report
        .cagr_pct
        .map_or_else(|| "N/A".to_string(), |c| format!("{c:.2}%"));

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![Cell::new("Period"), Cell::new(period)]);
    table.add_row(vec![
        Cell::new("Final value"),
        ui::number_cell(format!("{:.4}", report.final_value)),
    ]);
    table.add_row(vec![
        Cell::new("Total return"),
        ui::change_cell(report.total_return_pct),
    ]);
    table.add_row(vec![
        Cell::new("Notional"),
        ui::number_cell(format!(
            "{} -> {}",
            ui::format_money(report.notional, currency),
            ui::format_money(report.ending_value, currency)
        )),
    ]);
    table.add_row(vec![Cell::new("CAGR"), ui::number_cell(cagr)]);
    table.add_row(vec![
        Cell::new("Max drawdown"),
        ui::number_cell(format!("{:.2}%", report.max_drawdown_pct)),
    ]);
    table.add_row(vec![
        Cell::new("Included"),
        Cell::new(report.included.join(", ")),
    ]);

    format!(
        "{}\n\n{table}",
        ui::style_text("Backtest", ui::StyleType::Title)
    )
}

/// Samples the curve down to a handful of evenly spaced rows, always keeping
/// the last point.
pub(crate) fn sample_curve(curve: &[(NaiveDate, f64)], rows: usize) -> Vec<(NaiveDate, f64)> {
    if curve.len() <= rows || rows < 2 {
        return curve.to_vec();
    }
    let step = (curve.len() - 1) as f64 / (rows - 1) as f64;
    (0..rows)
        .map(|i| curve[((i as f64 * step).round() as usize).min(curve.len() - 1)])
        .collect()
}

fn curve_table(report: &BacktestReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Value")]);
    for (date, value) in sample_curve(&report.curve, CURVE_ROWS) {
        table.add_row(vec![
            Cell::new(date.to_string()),
            ui::number_cell(format!("{value:.4}")),
        ]);
    }
    table.to_string()
}
