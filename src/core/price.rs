//! Pricing abstractions and core types

use super::series::PriceSeries;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum HistoricalPeriod {
    OneDay,
    FiveDays,
    OneMonth,
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl Display for HistoricalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HistoricalPeriod::OneDay => "1D",
                HistoricalPeriod::FiveDays => "5D",
                HistoricalPeriod::OneMonth => "1M",
                HistoricalPeriod::OneYear => "1Y",
                HistoricalPeriod::ThreeYears => "3Y",
                HistoricalPeriod::FiveYears => "5Y",
                HistoricalPeriod::TenYears => "10Y",
            }
        )
    }
}

impl HistoricalPeriod {
    pub fn to_duration(&self) -> Duration {
        match self {
            HistoricalPeriod::OneDay => Duration::days(1),
            HistoricalPeriod::FiveDays => Duration::days(5),
            HistoricalPeriod::OneMonth => Duration::days(30),
            HistoricalPeriod::OneYear => Duration::days(365),
            HistoricalPeriod::ThreeYears => Duration::days(365 * 3),
            HistoricalPeriod::FiveYears => Duration::days(365 * 5),
            HistoricalPeriod::TenYears => Duration::days(365 * 10),
        }
    }

    /// Value of Yahoo's `range` query parameter.
    pub fn yahoo_range(&self) -> &'static str {
        match self {
            HistoricalPeriod::OneDay => "1d",
            HistoricalPeriod::FiveDays => "5d",
            HistoricalPeriod::OneMonth => "1mo",
            HistoricalPeriod::OneYear => "1y",
            HistoricalPeriod::ThreeYears => "3y",
            HistoricalPeriod::FiveYears => "5y",
            HistoricalPeriod::TenYears => "10y",
        }
    }
}

impl FromStr for HistoricalPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1D" => Ok(HistoricalPeriod::OneDay),
            "5D" => Ok(HistoricalPeriod::FiveDays),
            "1M" => Ok(HistoricalPeriod::OneMonth),
            "1Y" => Ok(HistoricalPeriod::OneYear),
            "3Y" => Ok(HistoricalPeriod::ThreeYears),
            "5Y" => Ok(HistoricalPeriod::FiveYears),
            "10Y" => Ok(HistoricalPeriod::TenYears),
            _ => Err(anyhow!("Invalid historical period: {}", s)),
        }
    }
}

/// The span of history to request: a trailing period or explicit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceWindow {
    Trailing(HistoricalPeriod),
    Range { start: NaiveDate, end: NaiveDate },
}

impl Display for PriceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceWindow::Trailing(period) => write!(f, "{period}"),
            PriceWindow::Range { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily history for `ticker`. An empty series means the provider knows
    /// the ticker but has no prices in the window.
    async fn fetch_series(&self, ticker: &str, window: PriceWindow) -> Result<PriceSeries>;

    /// Most recent price, taken from the last few trading days.
    async fn latest_price(&self, ticker: &str) -> Result<f64> {
        let series = self
            .fetch_series(ticker, PriceWindow::Trailing(HistoricalPeriod::FiveDays))
            .await?;
        series
            .last()
            .map(|p| p.price)
            .ok_or_else(|| anyhow!("No recent price found for symbol: {}", ticker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(PriceSeries);

    #[async_trait]
    impl PriceProvider for FixedProvider {
        async fn fetch_series(&self, _ticker: &str, _window: PriceWindow) -> Result<PriceSeries> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn parses_periods() {
        assert_eq!("3y".parse::<HistoricalPeriod>().unwrap(), HistoricalPeriod::ThreeYears);
        assert!("2W".parse::<HistoricalPeriod>().is_err());
        assert_eq!(HistoricalPeriod::OneMonth.yahoo_range(), "1mo");
    }

    #[tokio::test]
    async fn latest_price_uses_last_point() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let provider = FixedProvider(PriceSeries::from_points(vec![(d(3), 12.0), (d(4), 13.5)]));
        assert_eq!(provider.latest_price("X").await.unwrap(), 13.5);

        let empty = FixedProvider(PriceSeries::empty());
        assert_eq!(
            empty.latest_price("X").await.unwrap_err().to_string(),
            "No recent price found for symbol: X"
        );
    }
}
