//! Daily price table.
//!
//! Prices are held as one chronologically sorted sequence per security, so
//! every shift (previous close, next close) is a plain neighbour lookup inside
//! that sequence and can never leak across securities.

use crate::encoding::read_cp950;
use crate::table::{self, Header};
use crate::universe::SpecialSecurities;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tainan_traits::{Date, Result, Security};
use tracing::{debug, info};

/// Security column of the price export.
pub const SECURITY_COLUMN: &str = "證券代碼";
/// Trading date column of the price export (`%Y%m%d`).
pub const DATE_COLUMN: &str = "年月日";

/// Vendor header → canonical name.
pub const PRICE_COLUMNS: [(&str, &str); 7] = [
    ("開盤價(元)", "Open"),
    ("最高價(元)", "High"),
    ("最低價(元)", "Low"),
    ("收盤價(元)", "Close"),
    ("成交量(千股)", "Volume"),
    ("成交值(千元)", "QuoteVolume"),
    ("市值(百萬元)", "MarketCap"),
];

/// One trading day of one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date.
    pub date: Date,
    /// Opening price.
    pub open: Option<f64>,
    /// Intraday high.
    pub high: Option<f64>,
    /// Intraday low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Volume in thousand shares.
    pub volume: Option<f64>,
    /// Traded value in thousand NTD.
    pub quote_volume: Option<f64>,
    /// Market capitalization in million NTD.
    pub market_cap: Option<f64>,
    /// Previous trading day's close ("YSTD Close").
    pub prev_close: Option<f64>,
    /// Next trading day's close ("TMR Close").
    pub next_close: Option<f64>,
    /// `ln(next_close / close)`: the return earned by holding from this close
    /// into the next one. Forward-looking by construction.
    pub daily_return: Option<f64>,
}

impl PriceBar {
    /// A bar with only a date and close, everything else missing.
    pub const fn from_close(date: Date, close: Option<f64>) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            quote_volume: None,
            market_cap: None,
            prev_close: None,
            next_close: None,
            daily_return: None,
        }
    }

    /// Builder-style setter for market cap.
    pub const fn with_market_cap(mut self, market_cap: Option<f64>) -> Self {
        self.market_cap = market_cap;
        self
    }
}

/// Per-security daily price sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    series: BTreeMap<Security, Vec<PriceBar>>,
}

impl PriceTable {
    /// Build a table from `(security, bar)` pairs in any order.
    ///
    /// Each security's bars are sorted by date. When a date repeats, the
    /// first bar seen is kept.
    pub fn from_bars(bars: impl IntoIterator<Item = (Security, PriceBar)>) -> Self {
        let mut series: BTreeMap<Security, Vec<PriceBar>> = BTreeMap::new();
        for (security, bar) in bars {
            series.entry(security).or_default().push(bar);
        }
        let mut dropped = 0usize;
        for bars in series.values_mut() {
            bars.sort_by_key(|b| b.date);
            let before = bars.len();
            bars.dedup_by_key(|b| b.date);
            dropped += before - bars.len();
        }
        if dropped > 0 {
            debug!(dropped, "dropped duplicate price rows");
        }
        Self { series }
    }

    /// Concatenate several tables (e.g. yearly exports) into one.
    pub fn combine(tables: impl IntoIterator<Item = Self>) -> Self {
        Self::from_bars(tables.into_iter().flat_map(|t| {
            t.series
                .into_iter()
                .flat_map(|(security, bars)| bars.into_iter().map(move |b| (security.clone(), b)))
        }))
    }

    /// Fill previous close, next close and daily log return for every bar.
    ///
    /// The daily return of a security's last bar is missing, as is any return
    /// whose closes are missing or non-positive.
    pub fn with_daily_returns(&self) -> Self {
        let series = self
            .series
            .iter()
            .map(|(security, bars)| {
                let filled = bars
                    .iter()
                    .enumerate()
                    .map(|(i, bar)| {
                        let prev_close = i.checked_sub(1).and_then(|j| bars[j].close);
                        let next_close = bars.get(i + 1).and_then(|b| b.close);
                        PriceBar {
                            prev_close,
                            next_close,
                            daily_return: log_return(bar.close, next_close),
                            ..bar.clone()
                        }
                    })
                    .collect();
                (security.clone(), filled)
            })
            .collect();
        Self { series }
    }

    /// Drop every security in the exclusion set.
    pub fn exclude(&self, special: &SpecialSecurities) -> Self {
        let series: BTreeMap<_, _> = self
            .series
            .iter()
            .filter(|(security, _)| !special.contains(security))
            .map(|(s, b)| (s.clone(), b.clone()))
            .collect();
        debug!(
            excluded = self.series.len() - series.len(),
            "removed special securities from price table"
        );
        Self { series }
    }

    /// Securities in the table, in key order.
    pub fn securities(&self) -> impl Iterator<Item = &Security> {
        self.series.keys()
    }

    /// Chronological bars of one security.
    pub fn series(&self, security: &Security) -> Option<&[PriceBar]> {
        self.series.get(security).map(Vec::as_slice)
    }

    /// The bar of `security` on `date`, if traded.
    pub fn get(&self, security: &Security, date: Date) -> Option<&PriceBar> {
        let bars = self.series.get(security)?;
        bars.binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &bars[i])
    }

    /// All `(security, bar)` pairs, grouped by security then date.
    pub fn iter(&self) -> impl Iterator<Item = (&Security, &PriceBar)> {
        self.series
            .iter()
            .flat_map(|(security, bars)| bars.iter().map(move |b| (security, b)))
    }

    /// Number of securities.
    pub fn n_securities(&self) -> usize {
        self.series.len()
    }

    /// Total number of bars.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Whether the table holds no bars.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Long-format DataFrame view, one row per `(security, date)`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut securities = Vec::with_capacity(self.len());
        let mut dates = Vec::with_capacity(self.len());
        let mut cols: [Vec<Option<f64>>; 10] = Default::default();
        for (security, bar) in self.iter() {
            securities.push(security.to_string());
            dates.push(bar.date);
            let values = [
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                bar.quote_volume,
                bar.market_cap,
                bar.prev_close,
                bar.next_close,
                bar.daily_return,
            ];
            for (col, v) in cols.iter_mut().zip(values) {
                col.push(v);
            }
        }
        let names = [
            "Open",
            "High",
            "Low",
            "Close",
            "Volume",
            "QuoteVolume",
            "MarketCap",
            "YSTD Close",
            "TMR Close",
            "Daily Return",
        ];
        let mut columns = vec![
            Column::new("security".into(), securities),
            Column::new("date".into(), dates),
        ];
        for (name, values) in names.into_iter().zip(cols) {
            columns.push(Column::new(name.into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// `ln(next / close)` when both closes are present and positive.
pub fn log_return(close: Option<f64>, next: Option<f64>) -> Option<f64> {
    match (close, next) {
        (Some(c), Some(n)) if c > 0.0 && n > 0.0 => Some((n / c).ln()),
        _ => None,
    }
}

/// Parse a decoded daily price export.
///
/// # Errors
///
/// Fails if a required header is missing or a cell cannot be parsed.
pub fn parse_price_csv(text: &str) -> Result<PriceTable> {
    let (header, rows) = table::read_rows(text)?;
    let security_idx = header.require(SECURITY_COLUMN)?;
    let date_idx = header.require(DATE_COLUMN)?;
    let value_idx: Vec<(usize, &str)> = PRICE_COLUMNS
        .iter()
        .map(|(vendor, canonical)| header.require(vendor).map(|i| (i, *canonical)))
        .collect::<Result<_>>()?;

    let mut bars = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let line = line + 2;
        let security = Security::new(table::cell(row, security_idx));
        let date = table::parse_date(table::cell(row, date_idx), &["%Y%m%d", "%Y-%m-%d"])?;
        let mut values = [None; 7];
        for (slot, (idx, name)) in values.iter_mut().zip(&value_idx) {
            *slot = table::number_at(row, *idx, name, line)?;
        }
        let [open, high, low, close, volume, quote_volume, market_cap] = values;
        bars.push((
            security,
            PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume,
                quote_volume,
                market_cap,
                prev_close: None,
                next_close: None,
                daily_return: None,
            },
        ));
    }
    let table = PriceTable::from_bars(bars);
    log_unused_columns(&header);
    Ok(table)
}

/// Load a cp950 daily price export from disk.
pub fn load_price_data(path: impl AsRef<Path>) -> Result<PriceTable> {
    let path = path.as_ref();
    let table = parse_price_csv(&read_cp950(path)?)?;
    info!(
        path = %path.display(),
        securities = table.n_securities(),
        bars = table.len(),
        "loaded price data"
    );
    Ok(table)
}

fn log_unused_columns(header: &Header) {
    let unused: Vec<&str> = header
        .names()
        .iter()
        .map(String::as_str)
        .filter(|name| {
            *name != SECURITY_COLUMN
                && *name != DATE_COLUMN
                && !PRICE_COLUMNS.iter().any(|(vendor, _)| vendor == name)
        })
        .collect();
    if !unused.is_empty() {
        debug!(?unused, "ignoring extra price columns");
    }
}
