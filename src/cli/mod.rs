pub mod alloc;
pub mod backtest;
pub mod buy;
pub mod compare;
pub mod setup;
pub mod ui;

use crate::core::{InstrumentWarning, PlanError, PriceProvider, PriceSeries, PriceWindow};
use anyhow::Result;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Fetches every ticker's history concurrently.
pub(crate) async fn fetch_all_series(
    provider: &(dyn PriceProvider + Send + Sync),
    tickers: &BTreeSet<String>,
    window: PriceWindow,
) -> HashMap<String, Result<PriceSeries>> {
    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Fetching price history...");

    let futures = tickers.iter().map(|ticker| {
        let pb_clone = pb.clone();
        async move {
            let res = provider.fetch_series(ticker, window).await;
            pb_clone.inc(1);
            (ticker.clone(), res)
        }
    });

    let results: HashMap<String, Result<PriceSeries>> =
        join_all(futures).await.into_iter().collect();
    pb.finish_and_clear();
    results
}

/// Fetches the latest price of every ticker concurrently.
pub(crate) async fn fetch_latest_prices(
    provider: &(dyn PriceProvider + Send + Sync),
    tickers: &BTreeSet<String>,
) -> HashMap<String, Result<f64>> {
    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Fetching prices...");

    let futures = tickers.iter().map(|ticker| {
        let pb_clone = pb.clone();
        async move {
            let res = provider.latest_price(ticker).await;
            pb_clone.inc(1);
            (ticker.clone(), res)
        }
    });

    let results: HashMap<String, Result<f64>> = join_all(futures).await.into_iter().collect();
    pb.finish_and_clear();
    results
}

/// Prints recoverable planning errors as messages. Invalid input and
/// configuration still fail the command.
pub(crate) fn report_plan_error(error: PlanError) -> Result<()> {
    match error {
        PlanError::InvalidInput(_) | PlanError::InvalidConfig(_) => Err(error.into()),
        PlanError::InsufficientData { ref excluded } => {
            warn!(?excluded, "Backtest has no overlapping history");
            println!("{}", ui::style_text(&error.to_string(), ui::StyleType::Warning));
            for name in excluded {
                println!("  - {name}: excluded (no price history)");
            }
            Ok(())
        }
        PlanError::EmptySelection(_) | PlanError::DegenerateAllocation => {
            println!("{}", ui::style_text(&error.to_string(), ui::StyleType::Warning));
            Ok(())
        }
    }
}

pub(crate) fn print_warnings(title: &str, warnings: &[InstrumentWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{}", ui::style_text(title, ui::StyleType::Warning));
    for warning in warnings {
        println!(
            "  - {}: {}",
            warning.instrument,
            ui::style_text(&warning.reason, ui::StyleType::Subtle)
        );
    }
}
