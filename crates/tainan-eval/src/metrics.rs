//! Summary statistics of a daily return series.

use serde::{Deserialize, Serialize};

/// Trading days used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Headline statistics of one return series.
///
/// Missing returns are skipped; statistics that need more observations than
/// available are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Present (non-missing) observations.
    pub observations: usize,
    /// Return over the whole series.
    pub total_return: f64,
    /// Total return scaled to one year.
    pub annualized_return: Option<f64>,
    /// Sample standard deviation scaled to one year.
    pub annualized_volatility: Option<f64>,
    /// Annualized mean over standard deviation, zero risk-free rate.
    pub sharpe_ratio: Option<f64>,
    /// Largest peak-to-trough loss of the cumulative curve, as a fraction of the peak.
    pub max_drawdown: f64,
}

impl SummaryStats {
    /// Compute statistics for a daily series.
    ///
    /// # Arguments
    ///
    /// * `returns` - Daily returns, `None` where missing
    /// * `compounded` - Whether the series compounds (`Π(1 + r) - 1`) or adds
    ///   (`Σ r`)
    pub fn from_returns(returns: &[Option<f64>], compounded: bool) -> Self {
        let present: Vec<f64> = returns
            .iter()
            .flatten()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        let n = present.len();
        let years = n as f64 / TRADING_DAYS_PER_YEAR as f64;

        let total_return = if compounded {
            present.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
        } else {
            present.iter().sum()
        };
        let annualized_return = (n > 0).then(|| {
            if compounded {
                (1.0 + total_return).powf(1.0 / years) - 1.0
            } else {
                total_return / years
            }
        });
        let std = sample_std(&present);

        Self {
            observations: n,
            total_return,
            annualized_return,
            annualized_volatility: std.map(|s| s * (TRADING_DAYS_PER_YEAR as f64).sqrt()),
            sharpe_ratio: sharpe_ratio(&present, TRADING_DAYS_PER_YEAR),
            max_drawdown: max_drawdown(&cumulative(returns, compounded)),
        }
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Annualized Sharpe ratio of daily returns.
///
/// `None` with fewer than two observations or zero dispersion.
pub fn sharpe_ratio(returns: &[f64], trading_days_per_year: usize) -> Option<f64> {
    let std = sample_std(returns)?;
    if std == 0.0 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    Some(mean / std * (trading_days_per_year as f64).sqrt())
}

/// Maximum drawdown of a cumulative wealth curve starting at 1.0.
///
/// Missing points are skipped.
pub fn max_drawdown(curve: &[Option<f64>]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for &value in curve.iter().flatten() {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd
}

/// Cumulative wealth curve starting from 1.0.
///
/// Compounded: running product of `1 + r`. Additive: running sum plus one.
/// A missing return leaves the running value unchanged and yields a missing
/// point.
pub fn cumulative(returns: &[Option<f64>], compounded: bool) -> Vec<Option<f64>> {
    let mut level = if compounded { 1.0 } else { 0.0 };
    returns
        .iter()
        .map(|r| {
            let r = (*r)?;
            if compounded {
                level *= 1.0 + r;
                Some(level)
            } else {
                level += r;
                Some(level + 1.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cumulative_compounded() {
        let curve = cumulative(&[Some(0.1), None, Some(-0.5)], true);
        assert_relative_eq!(curve[0].unwrap(), 1.1);
        assert_eq!(curve[1], None);
        assert_relative_eq!(curve[2].unwrap(), 0.55);
    }

    #[test]
    fn test_cumulative_additive() {
        let curve = cumulative(&[Some(0.1), None, Some(-0.5)], false);
        assert_relative_eq!(curve[0].unwrap(), 1.1);
        assert_eq!(curve[1], None);
        assert_relative_eq!(curve[2].unwrap(), 0.6);
    }

    #[test]
    fn test_max_drawdown() {
        let curve = [Some(1.0), Some(1.2), None, Some(0.9), Some(1.3)];
        assert_relative_eq!(max_drawdown(&curve), 0.25);
        assert_eq!(max_drawdown(&[Some(1.1), Some(1.2)]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        assert_eq!(sharpe_ratio(&[0.01], 252), None);
        assert_eq!(sharpe_ratio(&[0.0, 0.0, 0.0], 252), None);
        let returns = [0.01, -0.01, 0.02, 0.0];
        let mean = 0.005;
        let var = (2.0 * 0.005_f64.powi(2) + 2.0 * 0.015_f64.powi(2)) / 3.0;
        assert_relative_eq!(
            sharpe_ratio(&returns, 252).unwrap(),
            mean / var.sqrt() * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_summary_stats() {
        let returns = vec![Some(0.01); 252];
        let stats = SummaryStats::from_returns(&returns, true);
        assert_eq!(stats.observations, 252);
        assert_relative_eq!(stats.total_return, 1.01_f64.powi(252) - 1.0, epsilon = 1e-9);
        assert_relative_eq!(stats.annualized_return.unwrap(), stats.total_return, epsilon = 1e-9);
        assert_eq!(stats.max_drawdown, 0.0);

        let additive = SummaryStats::from_returns(&[Some(0.01), None, Some(0.03)], false);
        assert_eq!(additive.observations, 2);
        assert_relative_eq!(additive.total_return, 0.04);

        let empty = SummaryStats::from_returns(&[None], true);
        assert_eq!(empty.observations, 0);
        assert_eq!(empty.annualized_return, None);
        assert_eq!(empty.annualized_volatility, None);
    }
}
