//! Panel command implementation.

use crate::cmd::{banner, prepare};
use crate::config::PipelineConfig;
use crate::data::load_inputs;
use anyhow::Result;
use serde::Serialize;
use tainan::panel::PreparedPanel;

#[derive(Debug, Serialize)]
struct PanelSummary<'a> {
    releases: usize,
    labelled: usize,
    outperformed: usize,
    train: usize,
    test: usize,
    first_period: Option<String>,
    last_period: Option<String>,
    split: String,
    features: &'a [String],
}

impl<'a> PanelSummary<'a> {
    fn new(config: &PipelineConfig, prepared: &'a PreparedPanel) -> Self {
        let rows = prepared.full.rows();
        let periods = prepared.full.periods();
        Self {
            releases: rows.len(),
            labelled: rows.iter().filter(|r| r.outperformed.is_some()).count(),
            outperformed: rows.iter().filter(|r| r.outperformed == Some(true)).count(),
            train: prepared.train.len(),
            test: prepared.test.len(),
            first_period: periods.first().map(ToString::to_string),
            last_period: periods.last().map(ToString::to_string),
            split: config.panel.split.to_string(),
            features: prepared.full.feature_names(),
        }
    }
}

/// Build the panel and print what went into it.
pub(crate) fn run(config: &PipelineConfig, json: bool) -> Result<()> {
    let inputs = load_inputs(&config.data)?;
    let prepared = prepare(config, &inputs)?;
    let summary = PanelSummary::new(config, &prepared);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    banner("Statement Panel");
    println!("Releases:     {}", summary.releases);
    println!(
        "Labelled:     {} ({} outperformed)",
        summary.labelled, summary.outperformed
    );
    println!(
        "Periods:      {} to {}",
        summary.first_period.as_deref().unwrap_or("-"),
        summary.last_period.as_deref().unwrap_or("-")
    );
    println!("Split:        {}", summary.split);
    println!("Train/Test:   {} / {}", summary.train, summary.test);
    println!("Features:     {}", summary.features.len());
    println!();
    println!("{}", prepared.full.to_frame()?.head(Some(10)));
    Ok(())
}
