//! Daily quantile-sort backtest for tainan.
//!
//! - [`sort`]: merge probabilities onto the price calendar, lag by one
//!   trading day, filter by market cap and rank into equal-population buckets
//! - [`portfolio`]: equal-weighted mean return of each bucket per date
//! - [`positions`]: bucket membership, weight lookups and cp950 export
//! - [`report`]: long-short spread, transaction costs, benchmarks and
//!   cumulative curves
//! - [`metrics`]: Sharpe ratio, drawdown and annualized statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use tainan_eval::{QuantileSorter, ReportConfig, Reporter, SortConfig};
//!
//! let sorted = QuantileSorter::new(SortConfig::default()).run(&probabilities, &prices)?;
//! let report = Reporter::new(ReportConfig::default()).report(&sorted.returns, &[])?;
//! println!("{:?}", report.long_short().map(|s| s.summary));
//! ```

pub mod metrics;
pub mod portfolio;
pub mod positions;
pub mod report;
pub mod sort;

pub use metrics::{
    SummaryStats, TRADING_DAYS_PER_YEAR, cumulative, max_drawdown, sharpe_ratio,
};
pub use portfolio::QuantileReturns;
pub use positions::{
    Holding, Position, PositionTable, export_positions, positions_frame, render_positions,
};
pub use report::{
    Benchmark, LONG_SHORT, PerformanceReport, PerformanceSeries, ReportConfig, Reporter,
};
pub use sort::{
    QuantileSorter, SortConfig, SortDiagnostics, SortResult, quantile_bucket, quantile_sort,
};
