//! Outperformance classifiers for tainan.
//!
//! [`LogisticRegression`] is the built-in [`Classifier`](tainan_traits::Classifier):
//! an L2-regularized logistic regression fitted by full-batch gradient
//! descent. [`score_panel`] turns any classifier's output into
//! [`ProbabilityRow`](tainan_traits::ProbabilityRow)s ready for the quantile
//! sort.
//!
//! # Example
//!
//! ```rust,ignore
//! use tainan_model::{LogisticConfig, fit_panel, score_panel};
//!
//! let model = fit_panel(&prepared.train, &LogisticConfig::default())?;
//! let probabilities = score_panel(&model, &prepared.test)?;
//! ```

pub mod logistic;
pub mod scoring;

pub use logistic::{LogisticConfig, LogisticRegression, sigmoid};
pub use scoring::{fit_panel, score_panel};
