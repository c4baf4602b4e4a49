//! Chart API response types.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Result, error::YahooError};

/// Top-level chart response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    /// Chart payload.
    pub chart: Chart,
}

/// Result list or error of a chart request.
#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    /// One entry per requested symbol.
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    /// Set when the request failed.
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// Error object returned in place of a result.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    /// Short error code, e.g. "Not Found".
    pub code: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
}

/// Price history of one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    /// Instrument metadata.
    pub meta: ChartMeta,
    /// Bar timestamps in seconds since the epoch.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    /// Price arrays aligned with `timestamp`.
    pub indicators: Indicators,
}

/// Instrument metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartMeta {
    /// Ticker symbol.
    pub symbol: String,
    /// Quote currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Exchange offset from UTC in seconds.
    #[serde(default, rename = "gmtoffset")]
    pub gmt_offset: i64,
}

/// Price arrays of a chart result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Indicators {
    /// Raw OHLCV quotes.
    #[serde(default)]
    pub quote: Vec<Quote>,
    /// Split and dividend adjusted closes.
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

/// Raw quote arrays; only the close is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quote {
    /// Closing prices.
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// Adjusted close array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjClose {
    /// Adjusted closing prices.
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

/// Daily adjusted closes of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Ticker symbol.
    pub symbol: String,
    /// Adjusted close by exchange-local trading date.
    pub closes: BTreeMap<NaiveDate, f64>,
}

impl PriceHistory {
    /// Number of trading days.
    #[must_use]
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    /// Whether there are no closes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// First and last trading date.
    #[must_use]
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.closes.keys().next()?, *self.closes.keys().next_back()?))
    }
}

impl ChartResponse {
    /// Extract the adjusted closes of the first result.
    ///
    /// Falls back to raw closes when the response carries no adjusted series.
    /// Null entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`YahooError::Api`] for an error payload and
    /// [`YahooError::NoData`] when no close survives.
    pub fn into_history(self, requested: &str) -> Result<PriceHistory> {
        if let Some(err) = self.chart.error {
            return Err(YahooError::Api(format!("{}: {}", err.code, err.description)));
        }
        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| YahooError::NoData(requested.to_string()))?;

        let ChartResult {
            meta,
            timestamp,
            indicators,
        } = result;
        let closes = match indicators.adjclose.into_iter().next() {
            Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
            _ => indicators
                .quote
                .into_iter()
                .next()
                .map(|q| q.close)
                .unwrap_or_default(),
        };

        let closes: BTreeMap<NaiveDate, f64> = timestamp
            .iter()
            .zip(closes)
            .filter_map(|(&ts, close)| {
                let date = DateTime::from_timestamp(ts + meta.gmt_offset, 0)?.date_naive();
                close.filter(|c| c.is_finite()).map(|c| (date, c))
            })
            .collect();

        if closes.is_empty() {
            return Err(YahooError::NoData(requested.to_string()));
        }
        Ok(PriceHistory {
            symbol: meta.symbol,
            closes,
        })
    }
}
