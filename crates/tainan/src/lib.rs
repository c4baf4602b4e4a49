#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tainan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Version information for the tainan crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Core types and the [`Classifier`] trait.
pub mod traits {
    pub use tainan_traits::*;
}

pub use tainan_traits::{
    Classifier, Date, PeriodKey, ProbabilityRow, Result, Security, SecurityDate, TainanError,
};

// ============================================================================
// Data Loading
// ============================================================================

/// cp950 loaders for the fundamental and daily price exports.
///
/// ```ignore
/// use tainan::data::{load_price_data, SpecialSecurities};
///
/// let prices = load_price_data("data/price.csv")?
///     .exclude(&SpecialSecurities::default())
///     .with_daily_returns();
/// ```
pub mod data {
    pub use tainan_data::*;
}

// ============================================================================
// Panel
// ============================================================================

/// Statement panel construction and feature engineering.
///
/// ## Seasonal Return
///
/// ```text
/// r = YSTD Close(next release) / TMR Close(this release) - 1
/// ```
///
/// A release outperforms when `r` beats the median of its fiscal period.
pub mod panel {
    pub use tainan_panel::*;
}

// ============================================================================
// Models
// ============================================================================

/// Classifiers and panel scoring.
pub mod model {
    pub use tainan_model::*;
}

// ============================================================================
// Evaluation
// ============================================================================

/// Quantile sort, positions and reporting.
///
/// ## Sort
///
/// Probabilities are carried forward on each security's trading calendar and
/// lagged one day. Every day the eligible securities are ranked by
/// probability and split into equal-population buckets, bucket 0 holding the
/// highest probabilities.
///
/// ## Spread
///
/// ```text
/// spread_t = R_t[long] - R_t[short] - tc
/// ```
pub mod eval {
    pub use tainan_eval::*;
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Yahoo chart client for benchmark closes.
///
/// Set `TAINAN_YAHOO_URL` to point the client at another host.
pub mod yahoo {
    pub use tainan_yahoo::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tainan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Classifier, Date, PeriodKey, ProbabilityRow, Result, Security, TainanError};
    pub use tainan_data::{
        FundamentalTable, PriceTable, SpecialSecurities, load_fundamental_data, load_price_data,
    };
    pub use tainan_eval::{
        Benchmark, PerformanceReport, QuantileSorter, ReportConfig, Reporter, SortConfig,
        SortResult,
    };
    pub use tainan_model::{LogisticConfig, LogisticRegression, fit_panel, score_panel};
    pub use tainan_panel::{Panel, PanelConfig, PanelPipeline, PreparedPanel};
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
    }

    #[test]
    fn test_re_exports() {
        fn accepts_classifier<C: Classifier>() {}
        accepts_classifier::<model::LogisticRegression>();
        assert_eq!(eval::SortConfig::default().quantiles, 10);
        assert_eq!(yahoo::BENCHMARKS.len(), 3);
    }

    #[test]
    fn test_error_types() {
        let _result: Result<()> = Ok(());
        let err: TainanError = yahoo::YahooError::NoData("^TWII".to_string()).into();
        assert!(matches!(err, TainanError::DataFetch(_)));
    }
}
