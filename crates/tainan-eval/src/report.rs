//! Long-short reporting over the quantile returns.

use crate::metrics::{SummaryStats, cumulative};
use crate::portfolio::QuantileReturns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tainan_traits::{Date, Result, TainanError};
use tracing::{info, warn};

/// Name of the long-short spread series.
pub const LONG_SHORT: &str = "long-short";

/// Configuration for [`Reporter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Bucket held long; `None` is the last bucket.
    pub long: Option<usize>,
    /// Bucket held short; `None` is bucket 0.
    pub short: Option<usize>,
    /// Cost charged against every daily bucket return and the spread.
    pub transaction_cost: f64,
    /// Compound returns instead of summing them.
    pub compounded: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            long: None,
            short: None,
            transaction_cost: 0.0001,
            compounded: false,
        }
    }
}

/// Closing prices of a benchmark instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Series name used in the report.
    pub name: String,
    /// Adjusted close by trading date.
    pub closes: BTreeMap<Date, f64>,
}

impl Benchmark {
    /// Create a benchmark from named closes.
    pub fn new(name: impl Into<String>, closes: BTreeMap<Date, f64>) -> Self {
        Self {
            name: name.into(),
            closes,
        }
    }

    /// Log return from each close to the next, dated at the earlier close.
    ///
    /// This lines up with the daily return of a portfolio formed at that
    /// close. The last date has no return.
    pub fn forward_log_returns(&self) -> BTreeMap<Date, f64> {
        self.closes
            .iter()
            .zip(self.closes.iter().skip(1))
            .filter(|((_, c0), (_, c1))| **c0 > 0.0 && **c1 > 0.0)
            .map(|((date, c0), (_, c1))| (*date, (c1 / c0).ln()))
            .collect()
    }
}

/// One reported return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    /// Series name.
    pub name: String,
    /// Daily returns aligned with [`PerformanceReport::dates`].
    pub returns: Vec<Option<f64>>,
    /// Cumulative curve starting from 1.0.
    pub cumulative: Vec<Option<f64>>,
    /// Headline statistics.
    pub summary: SummaryStats,
}

impl PerformanceSeries {
    fn new(name: impl Into<String>, returns: Vec<Option<f64>>, compounded: bool) -> Self {
        Self {
            name: name.into(),
            cumulative: cumulative(&returns, compounded),
            summary: SummaryStats::from_returns(&returns, compounded),
            returns,
        }
    }
}

/// Spread, bucket and benchmark performance on the portfolio's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Portfolio dates.
    pub dates: Vec<Date>,
    /// Bucket held long.
    pub long: usize,
    /// Bucket held short.
    pub short: usize,
    /// Long-short first, then every bucket, then benchmarks.
    pub series: Vec<PerformanceSeries>,
}

impl PerformanceReport {
    /// Look up a series by name (`"long-short"`, `"0"`, `"benchmark"`, ...).
    pub fn series(&self, name: &str) -> Option<&PerformanceSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    /// The long-short spread.
    pub fn long_short(&self) -> Option<&PerformanceSeries> {
        self.series(LONG_SHORT)
    }

    fn frame(&self, pick: impl Fn(&PerformanceSeries) -> &[Option<f64>]) -> Result<DataFrame> {
        let mut columns = vec![Column::new("date".into(), self.dates.clone())];
        for s in &self.series {
            columns.push(Column::new(s.name.as_str().into(), pick(s).to_vec()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Daily returns, one column per series.
    pub fn returns_frame(&self) -> Result<DataFrame> {
        self.frame(|s| s.returns.as_slice())
    }

    /// Cumulative curves, one column per series.
    pub fn cumulative_frame(&self) -> Result<DataFrame> {
        self.frame(|s| s.cumulative.as_slice())
    }

    /// One row of summary statistics per series.
    pub fn summary_frame(&self) -> Result<DataFrame> {
        let stats: Vec<&SummaryStats> = self.series.iter().map(|s| &s.summary).collect();
        Ok(DataFrame::new(vec![
            Column::new(
                "series".into(),
                self.series.iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                "observations".into(),
                stats.iter().map(|s| s.observations as u64).collect::<Vec<_>>(),
            ),
            Column::new(
                "total_return".into(),
                stats.iter().map(|s| s.total_return).collect::<Vec<_>>(),
            ),
            Column::new(
                "annualized_return".into(),
                stats.iter().map(|s| s.annualized_return).collect::<Vec<_>>(),
            ),
            Column::new(
                "annualized_volatility".into(),
                stats.iter().map(|s| s.annualized_volatility).collect::<Vec<_>>(),
            ),
            Column::new(
                "sharpe_ratio".into(),
                stats.iter().map(|s| s.sharpe_ratio).collect::<Vec<_>>(),
            ),
            Column::new(
                "max_drawdown".into(),
                stats.iter().map(|s| s.max_drawdown).collect::<Vec<_>>(),
            ),
        ])?)
    }
}

/// Builds a [`PerformanceReport`] from quantile returns.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    config: ReportConfig,
}

impl Reporter {
    /// Create a reporter with the given configuration.
    pub const fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Resolve the long and short buckets for `n_buckets` buckets.
    ///
    /// # Errors
    ///
    /// Fails if either selector is out of range.
    pub fn legs(&self, n_buckets: usize) -> Result<(usize, usize)> {
        let long = self.config.long.unwrap_or(n_buckets.saturating_sub(1));
        let short = self.config.short.unwrap_or(0);
        for (leg, bucket) in [("long", long), ("short", short)] {
            if bucket >= n_buckets {
                return Err(TainanError::InvalidData(format!(
                    "{leg} bucket {bucket} out of range for {n_buckets} buckets"
                )));
            }
        }
        Ok((long, short))
    }

    /// Build the report.
    ///
    /// # Arguments
    ///
    /// * `returns` - Output of the quantile sort
    /// * `benchmarks` - Benchmark closes; their returns are left-aligned on
    ///   the portfolio dates and carry no transaction cost
    ///
    /// # Errors
    ///
    /// Fails if the long or short selector is out of range.
    pub fn report(
        &self,
        returns: &QuantileReturns,
        benchmarks: &[Benchmark],
    ) -> Result<PerformanceReport> {
        let n = returns.n_buckets();
        let (long, short) = self.legs(n)?;
        let tc = self.config.transaction_cost;
        let compounded = self.config.compounded;
        let dates: Vec<Date> = returns.dates().collect();

        let spread: Vec<Option<f64>> = dates
            .iter()
            .map(|&date| Some(returns.get(date, long)? - returns.get(date, short)? - tc))
            .collect();

        let mut series = Vec::with_capacity(1 + n + benchmarks.len());
        series.push(PerformanceSeries::new(LONG_SHORT, spread, compounded));
        for bucket in 0..n {
            let net = returns
                .bucket_series(bucket)?
                .into_iter()
                .map(|r| r.map(|r| r - tc))
                .collect();
            series.push(PerformanceSeries::new(bucket.to_string(), net, compounded));
        }
        for benchmark in benchmarks {
            let forward = benchmark.forward_log_returns();
            let aligned: Vec<Option<f64>> =
                dates.iter().map(|d| forward.get(d).copied()).collect();
            if aligned.iter().all(Option::is_none) {
                warn!(benchmark = %benchmark.name, "benchmark does not overlap portfolio dates");
            }
            series.push(PerformanceSeries::new(
                benchmark.name.as_str(),
                aligned,
                compounded,
            ));
        }

        info!(
            dates = dates.len(),
            long,
            short,
            benchmarks = benchmarks.len(),
            "built performance report"
        );
        Ok(PerformanceReport {
            dates,
            long,
            short,
            series,
        })
    }
}
