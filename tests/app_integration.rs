use chrono::NaiveDate;
use std::fs;
use tiltfolio::core::{
    AssetCategory, HistoricalPeriod, PlanRequest, PriceProvider, PriceWindow, RiskTolerance,
};
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Chart response with one close per given day of March 2024, at 06:30 UTC.
    pub fn chart_response(closes: &[(u32, f64)]) -> String {
        let timestamps: Vec<String> = closes
            .iter()
            .map(|(day, _)| {
                NaiveDate::from_ymd_opt(2024, 3, *day)
                    .unwrap()
                    .and_hms_opt(6, 30, 0)
                    .unwrap()
                    .and_utc()
                    .timestamp()
                    .to_string()
            })
            .collect();
        let prices: Vec<String> = closes.iter().map(|(_, p)| p.to_string()).collect();
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "KRW", "gmtoffset": 32400 }},
                        "timestamp": [{}],
                        "indicators": {{
                            "quote": [{{ "close": [{}] }}],
                            "adjclose": [{{ "adjclose": [{}] }}]
                        }}
                    }}],
                    "error": null
                }}
            }}"#,
            timestamps.join(","),
            prices.join(","),
            prices.join(",")
        )
    }

    pub async fn mount_chart(server: &MockServer, symbol: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_failure(server: &MockServer, symbol: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    pub async fn create_mock_server() -> MockServer {
        let server = MockServer::start().await;
        mount_chart(
            &server,
            "069500.KS",
            chart_response(&[(4, 35_000.0), (5, 35_700.0), (6, 36_050.0), (7, 35_900.0)]),
        )
        .await;
        mount_chart(
            &server,
            "153130.KS",
            chart_response(&[(4, 107_000.0), (5, 107_020.0), (6, 107_050.0), (7, 107_080.0)]),
        )
        .await;
        mount_chart(
            &server,
            "411060.KS",
            chart_response(&[(4, 15_000.0), (5, 15_150.0), (7, 15_300.0)]),
        )
        .await;
        mount_failure(&server, "005930.KS").await;
        server
    }
}

fn write_config(dir: &tempfile::TempDir, base_url: &str) -> String {
    let config_path = dir.path().join("config.yaml");
    let config_content = format!(
        r#"
currency: "KRW"
providers:
  yahoo:
    base_url: {base_url}
backtest:
  notional: 10000000
instruments:
  - name: "Parking savings"
    category: cash
  - name: "KODEX Short-term Bond"
    category: short_term_bond
    ticker: "153130.KS"
  - name: "ACE KRX Gold Spot"
    category: gold
    ticker: "411060.KS"
  - name: "KODEX 200"
    category: equity_fund
    ticker: "069500.KS"
  - name: "Samsung Electronics"
    category: stock
    ticker: "005930.KS"
watchlist: ["069500.KS", "411060.KS", "005930.KS"]
"#
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

fn request(risk: f64) -> PlanRequest {
    PlanRequest::new(RiskTolerance::new(risk).unwrap(), AssetCategory::ALL)
}

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_allocate_runs_without_network() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, "http://127.0.0.1:9");

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Allocate(request(80.0)),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Allocate failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_buy_with_mock_prices() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Buy(request(65.0).with_amount(5_000_000.0)),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Buy failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_buy_rejects_unknown_instrument() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Buy(
            request(50.0)
                .with_instruments(["Bitcoin".to_string()])
                .with_amount(1_000_000.0),
        ),
        Some(&config_path),
    )
    .await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("unknown instrument: Bitcoin"));
}

#[test_log::test(tokio::test)]
async fn test_backtest_with_mock_history() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Backtest {
            request: request(50.0),
            span: PriceWindow::Range {
                start: march(1),
                end: march(31),
            },
            notional: None,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Backtest failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_backtest_without_history_is_not_fatal() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let only_stock = PlanRequest::new(RiskTolerance::new(90.0).unwrap(), [AssetCategory::Stock]);
    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Backtest {
            request: only_stock,
            span: PriceWindow::Range {
                start: march(1),
                end: march(31),
            },
            notional: Some(1000.0),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Backtest failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_compare_watchlist() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Compare {
            tickers: vec![],
            period: HistoricalPeriod::OneYear,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Compare failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_invalid_config_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
instruments:
  - name: "Gold"
    category: gold
    ticker: "GLD"
  - name: "gold"
    category: gold
    ticker: "IAU"
"#,
    )
    .unwrap();

    let result = tiltfolio::run_command(
        tiltfolio::AppCommand::Allocate(request(50.0)),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_cached_provider_hits_network_once() {
    use tiltfolio::providers::{CachingPriceProvider, YahooFinanceProvider};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/411060.KS"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(test_utils::chart_response(&[(4, 15_000.0), (5, 15_150.0)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = CachingPriceProvider::new(YahooFinanceProvider::new(&mock_server.uri()));
    let window = PriceWindow::Trailing(HistoricalPeriod::OneMonth);
    let first = provider.fetch_series("411060.KS", window).await.unwrap();
    let second = provider.fetch_series("411060.KS", window).await.unwrap();
    info!(points = first.len(), "Fetched gold history");

    assert_eq!(first, second);
    assert_eq!(first.first().unwrap().date, march(4));
    assert_eq!(first.last().unwrap().price, 15_150.0);
}
