use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::util::{RetryPolicy, with_retry};
use crate::core::price::{PriceProvider, PriceWindow};
use crate::core::series::PriceSeries;

/// Daily history from Yahoo's v8 chart endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    retry: RetryPolicy,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    fn chart_url(&self, symbol: &str, window: PriceWindow) -> String {
        let span = match window {
            PriceWindow::Trailing(period) => format!("range={}", period.yahoo_range()),
            PriceWindow::Range { start, end } => {
                let period1 = start.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp());
                // period2 is exclusive on Yahoo's side
                let period2 = end
                    .succ_opt()
                    .unwrap_or(end)
                    .and_hms_opt(0, 0, 0)
                    .map_or(0, |dt| dt.and_utc().timestamp());
                format!("period1={period1}&period2={period2}")
            }
        };
        format!(
            "{}/v8/finance/chart/{}?interval=1d&{}",
            self.base_url, symbol, span
        )
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "gmtoffset", default)]
    gmt_offset: i32,
}

/// Turns a chart item into a series, preferring adjusted closes. Bars with
/// a null close are skipped.
fn extract_series(item: &PriceChartItem) -> PriceSeries {
    let (Some(timestamps), Some(indicators)) = (item.timestamp.as_ref(), item.indicators.as_ref())
    else {
        return PriceSeries::empty();
    };

    let closes = indicators
        .adjclose
        .as_ref()
        .and_then(|a| a.first())
        .and_then(|a| a.adjclose.as_ref())
        .or_else(|| indicators.quote.first().and_then(|q| q.close.as_ref()));
    let Some(closes) = closes else {
        return PriceSeries::empty();
    };

    // Exchange-local dates, so a Seoul close is not filed under the previous UTC day.
    let offset = FixedOffset::east_opt(item.meta.gmt_offset).unwrap_or_else(|| Utc.fix());

    PriceSeries::from_points(timestamps.iter().zip(closes).filter_map(|(ts, close)| {
        let date = local_date(*ts, &offset)?;
        close.map(|price| (date, price))
    }))
}

fn local_date(ts: i64, offset: &FixedOffset) -> Option<NaiveDate> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.with_timezone(offset).date_naive())
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooSeriesFetch",
        skip(self),
        fields(symbol = %symbol, window = %window)
    )]
    async fn fetch_series(&self, symbol: &str, window: PriceWindow) -> Result<PriceSeries> {
        let url = self.chart_url(symbol, window);
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("tiltfolio/0.1")
            .build()?;
        let response = with_retry(self.retry, || client.get(&url).send())
            .await
            .with_context(|| format!("Request error for symbol: {symbol} URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo error for symbol {}: {}",
                symbol,
                error.description.unwrap_or_else(|| "unknown".to_string())
            ));
        }

        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let series = extract_series(item);
        debug!("Parsed {} daily prices for {}", series.len(), symbol);
        Ok(series)
    }
}
