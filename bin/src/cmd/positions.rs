//! Positions command implementation.

use crate::cmd::{banner, score, sort};
use crate::config::PipelineConfig;
use crate::data::load_inputs;
use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tainan::Security;
use tainan::eval::{Position, export_positions, positions_frame};

/// What to look up in the position table.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// Every member of the bucket on one date
    Date(NaiveDate),
    /// One security's weight in the bucket on every date
    Security(Security),
}

fn history_frame(positions: &[Position]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new(
            "date".into(),
            positions.iter().map(|p| p.date).collect::<Vec<_>>(),
        ),
        Column::new(
            "weight".into(),
            positions.iter().map(|p| p.weight).collect::<Vec<_>>(),
        ),
    ])?)
}

/// Sort, then print or export the requested positions.
pub(crate) fn run(
    config: &PipelineConfig,
    json: bool,
    bucket: usize,
    target: &Target,
    export: Option<&Path>,
) -> Result<()> {
    let inputs = load_inputs(&config.data)?;
    let scored = score(config, &inputs)?;
    let sorted = sort(config, &inputs, &scored.probabilities)?;

    let positions = match target {
        Target::Date(date) => sorted.positions.positions_at(bucket, *date)?,
        Target::Security(security) => sorted.positions.positions_for_security(bucket, security)?,
    };
    if let Some(path) = export {
        export_positions(&positions, bucket, path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&positions)?);
        return Ok(());
    }

    match target {
        Target::Date(date) => {
            banner(&format!("Bucket {bucket} on {date}"));
            println!("Members: {}", positions.len());
            println!();
            println!("{}", positions_frame(&positions, bucket)?);
        }
        Target::Security(security) => {
            banner(&format!("{security} in bucket {bucket}"));
            let held = positions.iter().filter(|p| p.weight > 0.0).count();
            println!("Held on {} of {} trading days", held, positions.len());
            println!();
            println!("{}", history_frame(&positions)?);
        }
    }
    Ok(())
}
