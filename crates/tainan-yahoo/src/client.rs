//! Yahoo chart API client implementation.

use crate::{
    Result,
    error::YahooError,
    types::{ChartResponse, PriceHistory},
};
use chrono::{Days, NaiveDate};
use reqwest::Client;
use std::env;
use tracing::{debug, info};

/// Base URL of the public chart API.
const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Environment variable overriding the public API host.
pub const BASE_URL_ENV: &str = "TAINAN_YAHOO_URL";

/// The chart API rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; tainan/0.1)";

/// Benchmarks reported next to the long-short portfolio: `(label, symbol)`.
pub const BENCHMARKS: [(&str, &str); 3] = [
    ("benchmark", "^TWII"),
    ("0050", "0050.TW"),
    ("reverse", "00632R.TW"),
];

/// Default first benchmark date, 2015-05-15.
#[must_use]
pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 5, 15).unwrap_or(NaiveDate::MIN)
}

/// Yahoo Finance chart client.
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the environment.
    ///
    /// Uses `TAINAN_YAHOO_URL` when set, loading a `.env` file if present,
    /// and the public endpoint otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| YAHOO_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Base URL in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the chart URL for a symbol and inclusive date range.
    fn url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = epoch_seconds(start);
        let period2 = epoch_seconds(end.checked_add_days(Days::new(1)).unwrap_or(end));
        format!(
            "{}/v8/finance/chart/{}?period1={period1}&period2={period2}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url,
            symbol.replace('^', "%5E"),
        )
    }

    /// Make a GET request and parse the chart response.
    async fn get(&self, url: &str) -> Result<ChartResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // error payloads still parse as a chart with an error object
            return match serde_json::from_str::<ChartResponse>(&text) {
                Ok(parsed) if parsed.chart.error.is_some() => Ok(parsed),
                _ => Err(YahooError::Api(format!("HTTP {status}: {text}"))),
            };
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Daily adjusted closes of `symbol` from `start` to `end`, inclusive.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Yahoo ticker, e.g. "^TWII" or "0050.TW"
    /// * `start` - First trading date
    /// * `end` - Last trading date
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted, the request fails, or the
    /// response holds no closes.
    pub async fn adjusted_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory> {
        if start > end {
            return Err(YahooError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let url = self.url(symbol, start, end);
        debug!(%url, "requesting chart");
        let history = self.get(&url).await?.into_history(symbol)?;
        info!(symbol, days = history.len(), "fetched price history");
        Ok(history)
    }

    /// Fetch every series in [`BENCHMARKS`], labelled.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error.
    pub async fn fetch_benchmarks(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(String, PriceHistory)>> {
        let mut out = Vec::with_capacity(BENCHMARKS.len());
        for (label, symbol) in BENCHMARKS {
            let history = self.adjusted_closes(symbol, start, end).await?;
            out.push((label.to_string(), history));
        }
        Ok(out)
    }
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |dt| dt.and_utc().timestamp())
}

/// Fetch the default benchmarks with a client built from the environment.
///
/// # Errors
///
/// Returns an error if the client cannot be built or any fetch fails.
pub async fn fetch_benchmarks(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(String, PriceHistory)>> {
    YahooClient::from_env()?.fetch_benchmarks(start, end).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = YahooClient::new("https://example.test/").unwrap();
        assert_eq!(
            client.url("^TWII", d(2024, 1, 2), d(2024, 1, 3)),
            "https://example.test/v8/finance/chart/%5ETWII?period1=1704153600&period2=1704326400&interval=1d&events=history&includeAdjustedClose=true"
        );
    }

    #[test]
    fn test_default_start() {
        assert_eq!(default_start(), d(2015, 5, 15));
    }

    #[test]
    fn test_benchmarks() {
        let symbols: Vec<&str> = BENCHMARKS.iter().map(|(_, s)| *s).collect();
        assert_eq!(symbols, vec!["^TWII", "0050.TW", "00632R.TW"]);
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_adjusted_closes_against_local_server() {
        let body = r#"{"chart": {"result": [{
            "meta": {"symbol": "^TWII", "gmtoffset": 28800},
            "timestamp": [1704157200, 1704243600],
            "indicators": {"quote": [{"close": [1.0, 2.0]}], "adjclose": [{"adjclose": [10.0, 11.0]}]}
        }], "error": null}}"#;
        let base = serve_once("200 OK", body).await;
        let client = YahooClient::new(base).unwrap();
        let history = client
            .adjusted_closes("^TWII", d(2024, 1, 1), d(2024, 1, 5))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.closes[&d(2024, 1, 3)], 11.0);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_api_error() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "delisted"}}}"#;
        let base = serve_once("404 Not Found", body).await;
        let client = YahooClient::new(base).unwrap();
        let err = client
            .adjusted_closes("NOPE", d(2024, 1, 1), d(2024, 1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, YahooError::Api(_)));
    }

    #[tokio::test]
    async fn test_inverted_range() {
        let client = YahooClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .adjusted_closes("^TWII", d(2024, 2, 1), d(2024, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, YahooError::InvalidRange { .. }));
    }
}
