//! Panel-level fitting and scoring.

use crate::logistic::{LogisticConfig, LogisticRegression};
use tainan_panel::Panel;
use tainan_traits::{Classifier, ProbabilityRow, Result};
use tracing::info;

/// Fit a logistic regression on a labelled panel.
///
/// # Errors
///
/// Fails if a feature is missing, a row is unlabelled, or fitting fails.
pub fn fit_panel(train: &Panel, config: &LogisticConfig) -> Result<LogisticRegression> {
    let x = train.feature_matrix()?;
    let y = train.label_vector()?;
    LogisticRegression::fit(x.view(), y.view(), config)
}

/// Score every panel row, keyed by security and release date.
///
/// Only feature columns reach the classifier; the seasonal return and the
/// period median never do.
///
/// # Errors
///
/// Fails with `InvalidData` on a missing feature, or with whatever the
/// classifier returns.
pub fn score_panel(classifier: &dyn Classifier, panel: &Panel) -> Result<Vec<ProbabilityRow>> {
    let x = panel.feature_matrix()?;
    let proba = classifier.predict_proba(x.view())?;
    let rows: Vec<ProbabilityRow> = panel
        .rows()
        .iter()
        .zip(proba.iter())
        .map(|(row, &probability)| ProbabilityRow {
            security: row.security.clone(),
            date: row.release_date,
            probability,
        })
        .collect();
    info!(
        model = classifier.name(),
        rows = rows.len(),
        "scored panel"
    );
    Ok(rows)
}
