#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tainan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types for the tainan research pipeline.
//!
//! Everything downstream of the loaders speaks in terms of these types: a
//! [`Security`] identifies a listed stock, a [`SecurityDate`] is the explicit
//! composite key every per-security sequence is ordered by, and a
//! [`PeriodKey`] buckets seasonal financial statements by year and month.

/// The version of the tainan-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod classifier;
pub mod error;
pub mod types;

pub use classifier::Classifier;
pub use error::{Result, TainanError};
pub use types::{Date, PeriodKey, ProbabilityRow, Security, SecurityDate};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
