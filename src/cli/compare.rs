use super::ui;
use crate::core::{HistoricalPeriod, PriceProvider, PriceSeries, PriceWindow};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_WATCHLIST: &[&str] = &[
    "MSFT", "AAPL", "NVDA", "GOOGL", "AMZN", "META", "TSLA", "BRK-A", "LLY", "JPM",
];

struct CompareRow {
    ticker: String,
    rebased: Option<PriceSeries>,
    error: Option<String>,
}

pub async fn run(
    tickers: &[String],
    period: HistoricalPeriod,
    provider: &(dyn PriceProvider + Send + Sync),
) -> Result<()> {
    if tickers.is_empty() {
        println!("No tickers to compare. Pass some on the command line or add a watchlist.");
        return Ok(());
    }

    let unique: BTreeSet<String> = tickers.iter().cloned().collect();
    let history = super::fetch_all_series(provider, &unique, PriceWindow::Trailing(period)).await;
    let rows = compare_rows(tickers, &history);

    println!(
        "Price performance over {} (rebased to 100)\n",
        ui::style_text(&period.to_string(), ui::StyleType::Title)
    );
    println!("{}", comparison_table(&rows));

    for row in rows.iter().filter(|r| r.error.is_some()) {
        if let Some(e) = &row.error {
            println!(
                "{} {}: {}",
                ui::style_text("Warning:", ui::StyleType::Warning),
                row.ticker,
                e
            );
        }
    }
    Ok(())
}

fn compare_rows(tickers: &[String], history: &HashMap<String, Result<PriceSeries>>) -> Vec<CompareRow> {
    let mut seen = BTreeSet::new();
    tickers
        .iter()
        .filter(|t| seen.insert(t.as_str()))
        .map(|ticker| match history.get(ticker) {
            Some(Ok(series)) if !series.is_empty() => CompareRow {
                ticker: ticker.clone(),
                rebased: Some(series.rebased()),
                error: None,
            },
            Some(Ok(_)) => CompareRow {
                ticker: ticker.clone(),
                rebased: None,
                error: Some("no prices in period".to_string()),
            },
            Some(Err(e)) => CompareRow {
                ticker: ticker.clone(),
                rebased: None,
                error: Some(e.to_string()),
            },
            None => CompareRow {
                ticker: ticker.clone(),
                rebased: None,
                error: Some("history not fetched".to_string()),
            },
        })
        .collect()
}

fn comparison_table(rows: &[CompareRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("First"),
        ui::header_cell("Last"),
        ui::header_cell("Change"),
        ui::header_cell("Points"),
    ]);

    for row in rows {
        let Some(series) = &row.rebased else {
            table.add_row(vec![
                Cell::new(&row.ticker),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
            ]);
            continue;
        };
        let first = series
            .first()
            .map_or_else(|| "N/A".to_string(), |p| p.date.to_string());
        let last = series
            .last()
            .map_or_else(|| "N/A".to_string(), |p| format!("{:.2}", p.price));
        let change = series
            .change_pct()
            .map_or_else(|| ui::na_cell(false), ui::change_cell);
        table.add_row(vec![
            Cell::new(&row.ticker),
            Cell::new(first),
            ui::number_cell(last),
            change,
            ui::number_cell(series.len().to_string()),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    #[test]
    fn rows_rebase_and_keep_failures() {
        let history = HashMap::from([
            (
                "MSFT".to_string(),
                Ok(PriceSeries::from_points(vec![(d(1), 400.0), (d(2), 420.0)])),
            ),
            ("OOPS".to_string(), Err(anyhow!("HTTP error: 404"))),
            ("EMPTY".to_string(), Ok(PriceSeries::empty())),
        ]);
        let tickers: Vec<String> = ["MSFT", "OOPS", "EMPTY", "MSFT"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        let rows = compare_rows(&tickers, &history);
        assert_eq!(rows.len(), 3);

        let msft = rows[0].rebased.as_ref().unwrap();
        assert_eq!(msft.first().unwrap().price, 100.0);
        assert!((msft.last().unwrap().price - 105.0).abs() < 1e-9);
        assert_eq!(rows[1].error.as_deref(), Some("HTTP error: 404"));
        assert_eq!(rows[2].error.as_deref(), Some("no prices in period"));

        let table = comparison_table(&rows);
        assert!(table.contains("105.00"));
        assert!(table.contains("5.00%"));
        assert!(table.contains("N/A"));
    }
}
