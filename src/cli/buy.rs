use super::ui;
use crate::core::apportion::{PlanPurchase, PricedInstrument, PurchaseOutcome, apportion_plan};
use crate::core::{
    AllocationModel, AssetCategory, Instrument, InstrumentRegistry, PlanError, PlanRequest,
    PriceProvider,
};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

pub async fn run(
    request: &PlanRequest,
    registry: &InstrumentRegistry,
    model: &AllocationModel,
    provider: &(dyn PriceProvider + Send + Sync),
    currency: &str,
) -> Result<()> {
    let Some(amount) = request.amount() else {
        return super::report_plan_error(PlanError::InvalidInput(
            "an investment amount is required".to_string(),
        ));
    };
    info!(amount, risk = request.risk().value(), "Planning purchases");

    let weights = match model.allocate(request.risk(), request.categories()) {
        Ok(weights) => weights,
        Err(e) => return super::report_plan_error(e),
    };
    let chosen = match request.resolve_instruments(registry) {
        Ok(chosen) => chosen,
        Err(e) => return super::report_plan_error(e),
    };

    let tickers: BTreeSet<String> = chosen
        .iter()
        .filter(|(category, _)| weights.get(**category) > 0.0)
        .flat_map(|(_, instruments)| instruments.iter().filter_map(|i| i.ticker.clone()))
        .collect();
    let prices = super::fetch_latest_prices(provider, &tickers).await;

    let priced = price_instruments(&chosen, &prices);
    match apportion_plan(amount, &weights, &priced) {
        Ok(plan) => {
            println!("{}", purchase_report(&plan, currency));
            for purchase in plan.categories.values() {
                super::print_warnings("Price unavailable:", &purchase.unavailable);
            }
            Ok(())
        }
        Err(e) => super::report_plan_error(e),
    }
}

pub(crate) fn price_instruments<'a>(
    chosen: &BTreeMap<AssetCategory, Vec<&'a Instrument>>,
    prices: &HashMap<String, Result<f64>>,
) -> BTreeMap<AssetCategory, Vec<PricedInstrument<'a>>> {
    chosen
        .iter()
        .map(|(category, instruments)| {
            let priced = instruments
                .iter()
                .copied()
                .map(|instrument| match &instrument.ticker {
                    None => PricedInstrument {
                        instrument,
                        price: None,
                        price_error: None,
                    },
                    Some(ticker) => match prices.get(ticker) {
                        Some(Ok(price)) => PricedInstrument::known(instrument, *price),
                        Some(Err(e)) => {
                            debug!("Price fetch error for {}: {}", ticker, e);
                            PricedInstrument::unknown(instrument, e.to_string())
                        }
                        None => PricedInstrument::unknown(instrument, "price not fetched"),
                    },
                })
                .collect();
            (*category, priced)
        })
        .collect()
}

pub(crate) fn purchase_report(plan: &PlanPurchase, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category / Investment"),
        ui::header_cell("Budget"),
        ui::header_cell("Unit price"),
        ui::header_cell("Units"),
        ui::header_cell("Spent"),
    ]);

    for (category, purchase) in &plan.categories {
        let (name, emoji) = category.display_info();
        table.add_row(vec![
            Cell::new(format!("{emoji} {name}")),
            ui::number_cell(ui::format_money(purchase.amount, currency)),
            Cell::new(""),
            Cell::new(""),
            ui::number_cell(ui::format_money(purchase.spent, currency)),
        ]);

        for line in &purchase.lines {
            let (units, spent) = match line.outcome {
                PurchaseOutcome::Bought { units, spent } => (
                    ui::number_cell(units.to_string()),
                    ui::number_cell(ui::format_money(spent, currency)),
                ),
                PurchaseOutcome::BelowMinimum { minimum_buy_in } => (
                    ui::number_cell("0".to_string()),
                    Cell::new(ui::style_text(
                        &format!("needs {}", ui::format_money(minimum_buy_in, currency)),
                        ui::StyleType::Warning,
                    )),
                ),
            };
            table.add_row(vec![
                Cell::new(format!("  {}", line.instrument)),
                Cell::new(ui::style_text(
                    &ui::format_money(line.budget, currency),
                    ui::StyleType::Subtle,
                )),
                ui::number_cell(ui::format_money(line.unit_price, currency)),
                units,
                spent,
            ]);
        }

        for warning in &purchase.unavailable {
            table.add_row(vec![
                Cell::new(format!("  {}", warning.instrument)),
                Cell::new(""),
                ui::na_cell(true),
                ui::na_cell(true),
                Cell::new(""),
            ]);
        }
    }

    for (category, amount) in &plan.skipped {
        let (name, emoji) = category.display_info();
        table.add_row(vec![
            Cell::new(format!("{emoji} {name}")),
            ui::number_cell(ui::format_money(*amount, currency)),
            Cell::new(ui::style_text("no instruments chosen", ui::StyleType::Subtle)),
            Cell::new(""),
            ui::number_cell(ui::format_money(0.0, currency)),
        ]);
    }

    format!(
        "{table}\n\n{}: {}\n{}: {}\n{}: {}",
        ui::style_text("Investable", ui::StyleType::TotalLabel),
        ui::format_money(plan.total_amount, currency),
        ui::style_text("Spent", ui::StyleType::TotalLabel),
        ui::style_text(
            &ui::format_money(plan.spent(), currency),
            ui::StyleType::TotalValue
        ),
        ui::style_text("Left as cash", ui::StyleType::TotalLabel),
        ui::format_money(plan.leftover(), currency),
    )
}
