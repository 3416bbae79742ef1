pub mod cli;
pub mod core;
pub mod providers;

pub use crate::core::config;

use crate::core::{HistoricalPeriod, PlanRequest, PriceWindow};
use crate::providers::{CachingPriceProvider, YahooFinanceProvider};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Allocate(PlanRequest),
    Buy(PlanRequest),
    Backtest {
        request: PlanRequest,
        span: PriceWindow,
        notional: Option<f64>,
    },
    Compare {
        tickers: Vec<String>,
        period: HistoricalPeriod,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tiltfolio starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let registry = config.registry()?;
    let model = config.allocation_model()?;
    let provider = CachingPriceProvider::new(YahooFinanceProvider::new(config.yahoo_base_url()));

    let result = match command {
        AppCommand::Allocate(request) => cli::alloc::run(&request, &model),
        AppCommand::Buy(request) => {
            cli::buy::run(&request, &registry, &model, &provider, &config.currency).await
        }
        AppCommand::Backtest {
            request,
            span,
            notional,
        } => {
            cli::backtest::run(
                &request,
                span,
                notional.unwrap_or(config.backtest.notional),
                &registry,
                &model,
                &provider,
                &config.currency,
            )
            .await
        }
        AppCommand::Compare { tickers, period } => {
            let tickers = match (tickers.is_empty(), config.watchlist.is_empty()) {
                (false, _) => tickers,
                (true, false) => config.watchlist.clone(),
                (true, true) => cli::compare::DEFAULT_WATCHLIST
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
            };
            cli::compare::run(&tickers, period, &provider).await
        }
    };

    let stats = provider.stats().await;
    debug!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        "Price cache"
    );
    result
}
