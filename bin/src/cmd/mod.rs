//! CLI subcommand modules.
//!
//! The stages shared by the subcommands live here: each subcommand runs the
//! pipeline as far as it needs and renders the result.

pub(crate) mod backtest;
pub(crate) mod panel;
pub(crate) mod positions;

use crate::config::PipelineConfig;
use crate::data::Inputs;
use anyhow::Result;
use tainan::ProbabilityRow;
use tainan::eval::{QuantileSorter, SortResult};
use tainan::model::{LogisticRegression, fit_panel, score_panel};
use tainan::panel::{PanelPipeline, PreparedPanel};

/// Prepared panel, fitted model and the test-set probabilities.
#[derive(Debug)]
pub(crate) struct Scored {
    pub(crate) prepared: PreparedPanel,
    pub(crate) model: LogisticRegression,
    pub(crate) probabilities: Vec<ProbabilityRow>,
}

pub(crate) fn prepare(config: &PipelineConfig, inputs: &Inputs) -> Result<PreparedPanel> {
    Ok(PanelPipeline::new(config.panel.clone()).run(&inputs.fundamentals, &inputs.prices)?)
}

/// Fit on the train periods and score every test release.
pub(crate) fn score(config: &PipelineConfig, inputs: &Inputs) -> Result<Scored> {
    let prepared = prepare(config, inputs)?;
    let model = fit_panel(&prepared.train, &config.model)?;
    let probabilities = score_panel(&model, &prepared.test)?;
    Ok(Scored {
        prepared,
        model,
        probabilities,
    })
}

pub(crate) fn sort(
    config: &PipelineConfig,
    inputs: &Inputs,
    probabilities: &[ProbabilityRow],
) -> Result<SortResult> {
    Ok(QuantileSorter::new(config.sort).run(probabilities, &inputs.prices)?)
}

pub(crate) fn banner(title: &str) {
    println!("\n╔{}╗", "═".repeat(62));
    println!("║{title:^62}║");
    println!("╚{}╝\n", "═".repeat(62));
}
