//! Backtest command implementation.

use crate::cmd::{banner, score, sort};
use crate::config::PipelineConfig;
use crate::data::{load_benchmarks, load_inputs};
use anyhow::Result;
use serde::Serialize;
use tainan::eval::{PerformanceReport, Reporter, SortDiagnostics};
use tracing::info;

#[derive(Debug, Serialize)]
struct ModelSummary<'a> {
    features: &'a [String],
    weights: Vec<f64>,
    intercept: f64,
    iterations: usize,
}

#[derive(Debug, Serialize)]
struct BacktestOutput<'a> {
    model: ModelSummary<'a>,
    probabilities: usize,
    degenerate_dates: Vec<&'a SortDiagnostics>,
    report: &'a PerformanceReport,
}

/// Run the full pipeline and print the long-short report.
pub(crate) async fn run(config: &PipelineConfig, json: bool, benchmarks: bool) -> Result<()> {
    let inputs = load_inputs(&config.data)?;
    let scored = score(config, &inputs)?;
    let sorted = sort(config, &inputs, &scored.probabilities)?;

    let benchmarks = if benchmarks {
        load_benchmarks(&config.benchmarks, sorted.returns.dates().last()).await?
    } else {
        info!("benchmarks disabled");
        Vec::new()
    };
    let report = Reporter::new(config.report).report(&sorted.returns, &benchmarks)?;
    let degenerate: Vec<&SortDiagnostics> = sorted.degenerate_dates().collect();

    if json {
        let output = BacktestOutput {
            model: ModelSummary {
                features: scored.prepared.train.feature_names(),
                weights: scored.model.weights().to_vec(),
                intercept: scored.model.intercept(),
                iterations: scored.model.iterations(),
            },
            probabilities: scored.probabilities.len(),
            degenerate_dates: degenerate,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    banner("Quantile Sort Backtest");
    println!("Train releases:  {}", scored.prepared.train.len());
    println!("Scored releases: {}", scored.probabilities.len());
    println!(
        "Model:           {} iterations, {} features",
        scored.model.iterations(),
        scored.model.weights().len()
    );
    println!("Quantiles:       {}", config.sort.quantiles);
    println!("Signal lag:      {} day(s)", config.sort.signal_lag);
    println!(
        "Long/Short:      {} / {} (cost {})",
        report.long, report.short, config.report.transaction_cost
    );
    println!("Trading days:    {}", report.dates.len());
    if !degenerate.is_empty() {
        println!(
            "Sparse dates:    {} (fewer than {} eligible)",
            degenerate.len(),
            config.sort.quantiles
        );
    }
    println!();

    println!("Performance:");
    println!("{}", report.summary_frame()?);
    println!();
    println!("Cumulative return (last 5 days):");
    println!("{}", report.cumulative_frame()?.tail(Some(5)));
    Ok(())
}
