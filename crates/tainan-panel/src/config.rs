//! Panel preparation settings and the end-to-end preparation step.

use crate::features::{
    ensure_complete, impute, label_outperformance, polynomial_transform, scale, train_test_split,
};
use crate::merge::{Panel, ReturnMode, build_panel};
use serde::{Deserialize, Serialize};
use tainan_data::{FundamentalTable, PriceTable};
use tainan_traits::{PeriodKey, Result, TainanError};
use tracing::info;

/// Configuration for turning raw tables into a model-ready panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Vendor feature columns to keep; empty keeps every numeric column.
    pub features: Vec<String>,

    /// New names for `features`, same length. Empty keeps the vendor names.
    pub rename: Vec<String>,

    /// Seasonal return convention
    pub return_mode: ReturnMode,

    /// Highest monomial degree of the polynomial expansion
    pub polynomial_degree: usize,

    /// First period of the test set
    pub split: PeriodKey,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            rename: Vec::new(),
            return_mode: ReturnMode::Simple,
            polynomial_degree: 1,
            split: PeriodKey::start_of_year(2022),
        }
    }
}

/// Output of [`PanelPipeline::run`].
#[derive(Debug, Clone)]
pub struct PreparedPanel {
    /// Every release after labelling and feature engineering.
    pub full: Panel,
    /// Labelled releases before the split.
    pub train: Panel,
    /// Every release from the split on, labelled or not.
    pub test: Panel,
}

/// Runs merge, labelling and feature engineering in order.
#[derive(Debug, Clone)]
pub struct PanelPipeline {
    config: PanelConfig,
}

impl PanelPipeline {
    /// Create a pipeline with the given configuration.
    pub const fn new(config: PanelConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Build the prepared panel.
    ///
    /// # Arguments
    ///
    /// * `fundamentals` - Deduplicated statement table
    /// * `prices` - Price table carrying previous and next closes
    ///
    /// # Errors
    ///
    /// Fails on an unknown feature name, a rename list of the wrong length, or
    /// an empty train set.
    pub fn run(
        &self,
        fundamentals: &FundamentalTable,
        prices: &PriceTable,
    ) -> Result<PreparedPanel> {
        let fundamentals = if self.config.features.is_empty() {
            fundamentals.clone()
        } else if self.config.rename.is_empty() {
            fundamentals.select_features(&self.config.features, &self.config.features)?
        } else {
            fundamentals.select_features(&self.config.features, &self.config.rename)?
        };

        let panel = build_panel(&fundamentals, prices, self.config.return_mode)?;
        let panel = impute(&label_outperformance(&panel));
        ensure_complete(&panel)?;
        let full = scale(&polynomial_transform(&panel, self.config.polynomial_degree)?);

        let (train, test) = train_test_split(&full, self.config.split);
        let train = train.filter(|r| r.outperformed.is_some());
        if train.is_empty() {
            return Err(TainanError::InsufficientData(format!(
                "no labelled releases before {}",
                self.config.split
            )));
        }
        info!(
            train = train.len(),
            test = test.len(),
            features = full.feature_names().len(),
            split = %self.config.split,
            "prepared panel"
        );
        Ok(PreparedPanel { full, train, test })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tainan_data::{FundamentalRecord, PriceBar};
    use tainan_traits::{Date, Security};

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixtures() -> (FundamentalTable, PriceTable) {
        let releases = [d(2021, 5, 14), d(2021, 8, 13), d(2022, 5, 13), d(2022, 8, 12)];
        let periods = ["202103", "202106", "202203", "202206"];
        let mut bars = Vec::new();
        let mut records = Vec::new();
        for (k, s) in ["A", "B", "C"].iter().enumerate() {
            for (i, release) in releases.iter().enumerate() {
                let base = 10.0 + k as f64 + i as f64 * (k as f64 + 1.0);
                for (offset, bump) in [(-1, 0.0), (0, 0.5), (1, 1.0)] {
                    let date = *release + chrono::Duration::days(offset);
                    bars.push((Security::from(*s), PriceBar::from_close(date, Some(base + bump))));
                }
                records.push(FundamentalRecord {
                    security: Security::from(*s),
                    release_date: *release,
                    period: periods[i].parse().unwrap(),
                    values: vec![Some(k as f64), if i == 1 { None } else { Some(i as f64) }],
                });
            }
        }
        let prices = PriceTable::from_bars(bars).with_daily_returns();
        let fundamentals =
            FundamentalTable::new(vec!["x".to_string(), "y".to_string()], records).unwrap();
        (fundamentals, prices)
    }

    #[test]
    fn test_default_config() {
        let config = PanelConfig::default();
        assert_eq!(config.split.to_string(), "2022-01");
        assert_eq!(config.polynomial_degree, 1);
        let parsed: PanelConfig = serde_json::from_str(r#"{"polynomial_degree": 2}"#).unwrap();
        assert_eq!(parsed.polynomial_degree, 2);
        assert_eq!(parsed.return_mode, ReturnMode::Simple);
    }

    #[test]
    fn test_pipeline_splits_and_expands() {
        let (fundamentals, prices) = fixtures();
        let config = PanelConfig {
            polynomial_degree: 2,
            ..PanelConfig::default()
        };
        let prepared = PanelPipeline::new(config).run(&fundamentals, &prices).unwrap();
        assert_eq!(prepared.full.feature_names(), &["1", "x", "y", "x^2", "x y", "y^2"]);
        // two 2021 periods, three securities, all with returns
        assert_eq!(prepared.train.len(), 6);
        assert_eq!(prepared.test.len(), 6);
        assert!(prepared.train.label_vector().is_ok());
        assert!(prepared.test.feature_matrix().is_ok());
    }

    #[test]
    fn test_pipeline_selects_and_renames() {
        let (fundamentals, prices) = fixtures();
        let config = PanelConfig {
            features: vec!["y".to_string()],
            rename: vec!["growth".to_string()],
            ..PanelConfig::default()
        };
        let prepared = PanelPipeline::new(config).run(&fundamentals, &prices).unwrap();
        assert_eq!(prepared.full.feature_names(), &["1", "growth"]);
    }

    #[test]
    fn test_pipeline_rejects_empty_train() {
        let (fundamentals, prices) = fixtures();
        let config = PanelConfig {
            split: "2000-01".parse().unwrap(),
            ..PanelConfig::default()
        };
        assert!(PanelPipeline::new(config).run(&fundamentals, &prices).is_err());
    }
}
