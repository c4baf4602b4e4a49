//! Error types for the Yahoo chart client.

use thiserror::Error;

/// Errors that can occur when fetching chart data.
#[derive(Debug, Error)]
pub enum YahooError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error.
    #[error("Yahoo API error: {0}")]
    Api(String),

    /// No data available.
    #[error("No data available for {0}")]
    NoData(String),

    /// Start date after end date.
    #[error("Invalid date range: {start} to {end}")]
    InvalidRange {
        /// Requested start
        start: String,
        /// Requested end
        end: String,
    },
}

impl From<YahooError> for tainan_traits::TainanError {
    fn from(err: YahooError) -> Self {
        Self::DataFetch(err.to_string())
    }
}
