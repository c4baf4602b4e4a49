//! Pipeline configuration for the CLI.
//!
//! Every stage reads its settings from one [`PipelineConfig`], loaded from an
//! optional JSON file and then overridden by command-line flags.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tainan::PeriodKey;
use tainan::eval::{ReportConfig, SortConfig};
use tainan::model::LogisticConfig;
use tainan::panel::PanelConfig;

/// Input files and universe filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DataConfig {
    /// Seasonal fundamental export
    pub(crate) fundamentals: PathBuf,

    /// Daily price exports, combined in order
    pub(crate) prices: Vec<PathBuf>,

    /// Keep preferred shares in the universe
    pub(crate) keep_preferred: bool,

    /// Extra securities to drop
    pub(crate) exclude: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fundamentals: PathBuf::from("data/ifrs.csv"),
            prices: vec![PathBuf::from("data/price_daily.csv")],
            keep_preferred: false,
            exclude: Vec::new(),
        }
    }
}

/// Benchmark download window. Unset bounds follow the backtest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BenchmarkConfig {
    pub(crate) start: Option<NaiveDate>,
    pub(crate) end: Option<NaiveDate>,
}

/// Settings for every stage of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PipelineConfig {
    pub(crate) data: DataConfig,
    pub(crate) panel: PanelConfig,
    pub(crate) model: LogisticConfig,
    pub(crate) sort: SortConfig,
    pub(crate) report: ReportConfig,
    pub(crate) benchmarks: BenchmarkConfig,
}

impl PipelineConfig {
    /// Read `path` if given, defaults otherwise.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub(crate) fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Input overrides shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub(crate) struct InputArgs {
    /// Fundamental export (cp950)
    #[arg(long)]
    fundamentals: Option<PathBuf>,

    /// Price exports (cp950), comma-separated
    #[arg(long, value_delimiter = ',')]
    prices: Vec<PathBuf>,

    /// Highest polynomial degree of the features
    #[arg(long)]
    degree: Option<usize>,

    /// First period of the test set (YYYY-MM)
    #[arg(long)]
    split: Option<PeriodKey>,
}

impl InputArgs {
    pub(crate) fn apply(self, config: &mut PipelineConfig) {
        if let Some(path) = self.fundamentals {
            config.data.fundamentals = path;
        }
        if !self.prices.is_empty() {
            config.data.prices = self.prices;
        }
        if let Some(degree) = self.degree {
            config.panel.polynomial_degree = degree;
        }
        if let Some(split) = self.split {
            config.panel.split = split;
        }
    }
}

/// Quantile sort overrides.
#[derive(Debug, Clone, Args)]
pub(crate) struct SortArgs {
    /// Number of buckets
    #[arg(short, long)]
    quantiles: Option<usize>,

    /// Inclusive market cap floor
    #[arg(long)]
    cap_lower: Option<f64>,

    /// Exclusive market cap ceiling
    #[arg(long)]
    cap_upper: Option<f64>,

    /// Trading days between a probability and its first use
    #[arg(long)]
    lag: Option<usize>,
}

impl SortArgs {
    pub(crate) fn apply(self, config: &mut PipelineConfig) {
        if let Some(q) = self.quantiles {
            config.sort.quantiles = q;
        }
        if let Some(lower) = self.cap_lower {
            config.sort.market_cap_lower = lower;
        }
        if self.cap_upper.is_some() {
            config.sort.market_cap_upper = self.cap_upper;
        }
        if let Some(lag) = self.lag {
            config.sort.signal_lag = lag;
        }
    }
}

/// Long-short report overrides.
#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArgs {
    /// Long bucket (default: last)
    #[arg(long)]
    long: Option<usize>,

    /// Short bucket (default: 0)
    #[arg(long)]
    short: Option<usize>,

    /// Daily transaction cost deducted from every portfolio
    #[arg(long)]
    cost: Option<f64>,

    /// Compound the cumulative curves instead of summing
    #[arg(long)]
    compounded: bool,
}

impl ReportArgs {
    pub(crate) fn apply(self, config: &mut PipelineConfig) {
        if self.long.is_some() {
            config.report.long = self.long;
        }
        if self.short.is_some() {
            config.report.short = self.short;
        }
        if let Some(cost) = self.cost {
            config.report.transaction_cost = cost;
        }
        if self.compounded {
            config.report.compounded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.data.fundamentals, PathBuf::from("data/ifrs.csv"));
        assert_eq!(config.sort.quantiles, 10);
        assert_eq!(config.sort.signal_lag, 1);
        assert!(!config.report.compounded);
        assert_eq!(config.benchmarks.start, None);
    }

    #[test]
    fn test_partial_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "data": {"prices": ["a.csv", "b.csv"]},
                "panel": {"split": "2021-07", "polynomial_degree": 2},
                "sort": {"quantiles": 5, "market_cap_upper": 1e10},
                "report": {"long": 4, "short": 0},
                "benchmarks": {"start": "2020-01-02"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.data.prices.len(), 2);
        assert_eq!(config.data.fundamentals, PathBuf::from("data/ifrs.csv"));
        assert_eq!(config.panel.split.to_string(), "2021-07");
        assert_eq!(config.panel.polynomial_degree, 2);
        assert_eq!(config.sort.quantiles, 5);
        assert_eq!(config.sort.market_cap_upper, Some(1e10));
        assert_eq!(config.sort.signal_lag, 1);
        assert_eq!(config.report.long, Some(4));
        assert_eq!(config.benchmarks.start, NaiveDate::from_ymd_opt(2020, 1, 2));
        assert_eq!(config.model, LogisticConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(PipelineConfig::from_json(r#"{"sort": {"quantiles": "ten"}}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"panel": {"split": "2021"}}"#).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = PipelineConfig::default();
        SortArgs {
            quantiles: Some(4),
            cap_lower: None,
            cap_upper: Some(5e9),
            lag: None,
        }
        .apply(&mut config);
        ReportArgs {
            long: None,
            short: Some(1),
            cost: Some(0.0),
            compounded: true,
        }
        .apply(&mut config);
        assert_eq!(config.sort.quantiles, 4);
        assert_eq!(config.sort.market_cap_lower, 0.0);
        assert_eq!(config.sort.market_cap_upper, Some(5e9));
        assert_eq!(config.report.long, None);
        assert_eq!(config.report.short, Some(1));
        assert_eq!(config.report.transaction_cost, 0.0);
        assert!(config.report.compounded);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(PipelineConfig::load(Some(Path::new("does/not/exist.json"))).is_err());
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }
}
