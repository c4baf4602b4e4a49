//! Feature engineering on the statement panel.
//!
//! None of these steps touch the seasonal return: it is the target, and any
//! transformation of it would leak into the label.

use crate::merge::{Panel, PanelRow};
use std::collections::{BTreeMap, HashMap};
use tainan_traits::{PeriodKey, Result, Security, TainanError};
use tracing::debug;

/// Median of the values, averaging the two middle ones for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Attach the per-period cross-section median and the outperformance label.
///
/// Rows without a seasonal return stay unlabelled and do not enter the
/// median.
pub fn label_outperformance(panel: &Panel) -> Panel {
    let mut by_period: BTreeMap<PeriodKey, Vec<f64>> = BTreeMap::new();
    for row in panel.rows() {
        if let Some(r) = row.seasonal_return {
            by_period.entry(row.period).or_default().push(r);
        }
    }
    let medians: BTreeMap<PeriodKey, f64> = by_period
        .into_iter()
        .filter_map(|(period, values)| median(&values).map(|m| (period, m)))
        .collect();

    let rows = panel
        .rows()
        .iter()
        .map(|row| {
            let cross_section_median = medians.get(&row.period).copied();
            let outperformed = row
                .seasonal_return
                .zip(cross_section_median)
                .map(|(r, m)| r > m);
            PanelRow {
                cross_section_median,
                outperformed,
                ..row.clone()
            }
        })
        .collect();
    panel.with_rows(rows)
}

/// Forward-fill every feature within each security, then fill what is
/// still missing with zero.
///
/// Rows are visited in panel order (period ascending), so a security's
/// latest known value carries into later periods only.
pub fn impute(panel: &Panel) -> Panel {
    let width = panel.feature_names().len();
    let mut last: HashMap<&Security, Vec<Option<f64>>> = HashMap::new();
    let mut filled = 0usize;
    let features = panel
        .rows()
        .iter()
        .map(|row| {
            let carry = last.entry(&row.security).or_insert_with(|| vec![None; width]);
            row.features
                .iter()
                .zip(carry.iter_mut())
                .map(|(value, carried)| {
                    if value.is_some() {
                        *carried = *value;
                    } else {
                        filled += 1;
                    }
                    Some(carried.unwrap_or(0.0))
                })
                .collect()
        })
        .collect();
    debug!(filled, "imputed missing feature values");
    panel.replace_features(panel.feature_names().to_vec(), features)
}

/// Standardize each feature to zero mean and unit population variance.
///
/// Statistics use present values only and missing values stay missing. A
/// constant column is centered but not rescaled.
pub fn scale(panel: &Panel) -> Panel {
    let width = panel.feature_names().len();
    let stats: Vec<(f64, f64)> = (0..width)
        .map(|j| {
            let values: Vec<f64> = panel.rows().iter().filter_map(|r| r.features[j]).collect();
            if values.is_empty() {
                return (0.0, 1.0);
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            (mean, if std > 0.0 { std } else { 1.0 })
        })
        .collect();
    let features = panel
        .rows()
        .iter()
        .map(|row| {
            row.features
                .iter()
                .zip(&stats)
                .map(|(value, (mean, std))| value.map(|v| (v - mean) / std))
                .collect()
        })
        .collect();
    panel.replace_features(panel.feature_names().to_vec(), features)
}

/// Exponent tuples of every monomial up to `degree`, bias first, then by
/// degree, each degree in lexicographic order of feature indices.
fn monomials(n_features: usize, degree: usize) -> Vec<Vec<usize>> {
    fn extend(
        start: usize,
        n: usize,
        k: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            extend(i, n, k, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    for k in 0..=degree {
        extend(0, n_features, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

fn monomial_name(names: &[String], combo: &[usize]) -> String {
    if combo.is_empty() {
        return "1".to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < combo.len() {
        let power = combo[i..].iter().take_while(|&&c| c == combo[i]).count();
        let name = &names[combo[i]];
        parts.push(if power > 1 {
            format!("{name}^{power}")
        } else {
            name.clone()
        });
        i += power;
    }
    parts.join(" ")
}

/// Replace the features with every monomial of total degree `0..=degree`.
///
/// For features `a, b` and degree 2 the new columns are
/// `1, a, b, a^2, a b, b^2`.
///
/// # Errors
///
/// Fails if any feature value is missing.
pub fn polynomial_transform(panel: &Panel, degree: usize) -> Result<Panel> {
    let x = panel.feature_matrix()?;
    let combos = monomials(x.ncols(), degree);
    let names = combos
        .iter()
        .map(|c| monomial_name(panel.feature_names(), c))
        .collect();
    let features = x
        .rows()
        .into_iter()
        .map(|row| {
            combos
                .iter()
                .map(|c| Some(c.iter().map(|&j| row[j]).product::<f64>()))
                .collect()
        })
        .collect();
    Ok(panel.replace_features(names, features))
}

/// Split by period: rows before `split` train, the rest test.
pub fn train_test_split(panel: &Panel, split: PeriodKey) -> (Panel, Panel) {
    (
        panel.filter(|r| r.period < split),
        panel.filter(|r| r.period >= split),
    )
}

/// Error unless every feature of every row is present.
pub fn ensure_complete(panel: &Panel) -> Result<()> {
    match panel
        .rows()
        .iter()
        .find(|r| r.features.iter().any(Option::is_none))
    {
        Some(row) => Err(TainanError::InvalidData(format!(
            "incomplete features for {} @ {}",
            row.security, row.release_date
        ))),
        None => Ok(()),
    }
}
