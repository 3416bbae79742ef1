use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tiltfolio::core::log::init_logging;
use tiltfolio::core::{AssetCategory, HistoricalPeriod, PlanRequest, PriceWindow, RiskTolerance};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable logging; repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Selection {
    /// Risk tolerance from 0 (most defensive) to 100 (most aggressive)
    #[arg(short, long, default_value_t = 50.0)]
    risk: f64,

    /// Asset category to include; repeat for more. Defaults to all of them
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<AssetCategory>,
}

impl Selection {
    fn into_request(self) -> Result<PlanRequest> {
        let risk = RiskTolerance::new(self.risk)?;
        let categories = if self.categories.is_empty() {
            AssetCategory::ALL.to_vec()
        } else {
            self.categories
        };
        Ok(PlanRequest::new(risk, categories))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the category split for a risk tolerance
    Allocate {
        #[command(flatten)]
        selection: Selection,
    },
    /// Turn an investable amount into whole-unit purchases
    Buy {
        #[command(flatten)]
        selection: Selection,
        /// Amount to invest, in the configured currency
        #[arg(short, long)]
        amount: f64,
        /// Registry instrument to buy; repeat for more. Defaults to every instrument in the selected categories
        #[arg(long = "instrument", value_name = "NAME")]
        instruments: Vec<String>,
    },
    /// Replay the allocation over past prices
    Backtest {
        #[command(flatten)]
        selection: Selection,
        /// Registry instrument to include; repeat for more
        #[arg(long = "instrument", value_name = "NAME")]
        instruments: Vec<String>,
        /// Trailing period (1M, 1Y, 3Y, 5Y, 10Y)
        #[arg(short, long, conflicts_with_all = ["start", "end"])]
        period: Option<HistoricalPeriod>,
        /// First day of the backtest (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        /// Last day of the backtest (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
        /// Starting amount the growth curve is scaled to
        #[arg(short, long)]
        notional: Option<f64>,
    },
    /// Compare rebased price histories of tickers or the watchlist
    Compare {
        /// Trailing period
        #[arg(short, long, default_value = "3Y")]
        period: HistoricalPeriod,
        /// Tickers to compare. Defaults to the configured watchlist
        tickers: Vec<String>,
    },
}

fn to_app_command(cmd: Commands) -> Result<tiltfolio::AppCommand> {
    Ok(match cmd {
        Commands::Allocate { selection } => tiltfolio::AppCommand::Allocate(selection.into_request()?),
        Commands::Buy {
            selection,
            amount,
            instruments,
        } => tiltfolio::AppCommand::Buy(
            selection
                .into_request()?
                .with_instruments(instruments)
                .with_amount(amount),
        ),
        Commands::Backtest {
            selection,
            instruments,
            period,
            start,
            end,
            notional,
        } => {
            let span = match (start, end) {
                (Some(start), Some(end)) => PriceWindow::Range { start, end },
                _ => PriceWindow::Trailing(period.unwrap_or(HistoricalPeriod::OneYear)),
            };
            tiltfolio::AppCommand::Backtest {
                request: selection.into_request()?.with_instruments(instruments),
                span,
                notional,
            }
        }
        Commands::Compare { period, tickers } => tiltfolio::AppCommand::Compare { tickers, period },
        Commands::Setup => unreachable!("Setup command should be handled separately"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => tiltfolio::cli::setup::setup_at_path(path),
            None => tiltfolio::cli::setup::setup(),
        },
        Some(cmd) => match to_app_command(cmd) {
            Ok(command) => tiltfolio::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
