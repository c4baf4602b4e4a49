#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tainan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod features;
pub mod merge;

pub use config::{PanelConfig, PanelPipeline, PreparedPanel};
pub use features::{
    ensure_complete, impute, label_outperformance, median, polynomial_transform, scale,
    train_test_split,
};
pub use merge::{Panel, PanelRow, ReturnMode, build_panel};
