//! Daily quantile sort of classifier probabilities.
//!
//! Probabilities are known at the close of their release date. They are
//! merged onto each security's trading calendar, carried forward until the
//! next release, and lagged by one trading day before ranking, so a position
//! held over day `d` only uses information available at the close of `d - 1`.

use crate::portfolio::QuantileReturns;
use crate::positions::{Holding, PositionTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tainan_data::PriceTable;
use tainan_traits::{Date, ProbabilityRow, Result, Security, SecurityDate, TainanError};
use tracing::{debug, info};

/// Configuration for [`QuantileSorter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Number of buckets.
    pub quantiles: usize,
    /// Inclusive lower market-cap bound.
    pub market_cap_lower: f64,
    /// Exclusive upper market-cap bound; `None` is unbounded.
    pub market_cap_upper: Option<f64>,
    /// Trading days between a probability becoming known and being used.
    pub signal_lag: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            quantiles: 10,
            market_cap_lower: 0.0,
            market_cap_upper: None,
            signal_lag: 1,
        }
    }
}

impl SortConfig {
    /// Whether `market_cap` lies in `[lower, upper)`.
    pub fn admits(&self, market_cap: f64) -> bool {
        market_cap >= self.market_cap_lower
            && self.market_cap_upper.is_none_or(|upper| market_cap < upper)
    }
}

/// What the sort saw on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDiagnostics {
    /// Trading date.
    pub date: Date,
    /// Securities that passed every filter.
    pub eligible: usize,
    /// Buckets with at least one member.
    pub buckets_filled: usize,
}

/// Output of [`QuantileSorter::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortResult {
    /// Mean daily return per date and bucket.
    pub returns: QuantileReturns,
    /// Bucket membership and weights.
    pub positions: PositionTable,
    /// One entry per sorted date.
    pub diagnostics: Vec<SortDiagnostics>,
}

impl SortResult {
    /// Dates where fewer buckets than requested were filled.
    pub fn degenerate_dates(&self) -> impl Iterator<Item = &SortDiagnostics> + '_ {
        let q = self.returns.n_buckets();
        self.diagnostics.iter().filter(move |d| d.buckets_filled < q)
    }
}

/// Bucket of the `rank`-th highest value (1-based) out of `n`, for `q`
/// buckets.
///
/// Equal-population edges are placed at `1 + (n - 1) * i / q`; a rank falls
/// in the first bucket whose upper edge it does not exceed. With fewer
/// values than buckets some buckets stay empty. A lone value collapses every
/// edge onto one point and gets no bucket.
pub fn quantile_bucket(rank: usize, n: usize, q: usize) -> Option<usize> {
    if n <= 1 {
        return None;
    }
    if rank <= 1 {
        return Some(0);
    }
    Some(((rank - 1) * q).div_ceil(n - 1) - 1)
}

#[derive(Debug, Default, Clone, Copy)]
struct MergedRow {
    probability: Option<f64>,
    market_cap: Option<f64>,
    daily_return: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Eligible<'a> {
    security: &'a Security,
    probability: f64,
    daily_return: f64,
}

/// Ranks securities into buckets every trading day.
#[derive(Debug, Clone, Default)]
pub struct QuantileSorter {
    config: SortConfig,
}

impl QuantileSorter {
    /// Create a sorter with the given configuration.
    pub const fn new(config: SortConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Run the sort.
    ///
    /// # Arguments
    ///
    /// * `probabilities` - Classifier output keyed by security and release
    ///   date. When a key repeats, the later row wins.
    /// * `prices` - Daily prices carrying market cap and daily return
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` if the bucket count is zero.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tainan_eval::{QuantileSorter, SortConfig};
    ///
    /// let result = QuantileSorter::new(SortConfig::default()).run(&probabilities, &prices)?;
    /// println!("{} sorted dates", result.returns.len());
    /// ```
    pub fn run(
        &self,
        probabilities: &[ProbabilityRow],
        prices: &PriceTable,
    ) -> Result<SortResult> {
        let q = self.config.quantiles;
        if q == 0 {
            return Err(TainanError::InvalidData(
                "quantile count must be positive".into(),
            ));
        }

        let merged = merge(probabilities, prices);
        let by_date = self.eligible_by_date(&merged);

        let mut returns = QuantileReturns::new(q);
        let mut positions = PositionTable::new(q);
        let mut diagnostics = Vec::with_capacity(by_date.len());

        for (date, mut rows) in by_date {
            // rows arrive in security order; the stable sort keeps it for ties
            rows.sort_by(|a, b| b.probability.total_cmp(&a.probability));
            let n = rows.len();

            let mut members: Vec<Vec<&Eligible<'_>>> = vec![Vec::new(); q];
            for (i, row) in rows.iter().enumerate() {
                if let Some(bucket) = quantile_bucket(i + 1, n, q) {
                    members[bucket].push(row);
                }
            }
            let buckets_filled = members.iter().filter(|m| !m.is_empty()).count();
            if buckets_filled < q {
                debug!(
                    %date,
                    eligible = n,
                    buckets_filled,
                    quantiles = q,
                    "fewer buckets than requested"
                );
            }
            diagnostics.push(SortDiagnostics {
                date,
                eligible: n,
                buckets_filled,
            });
            if buckets_filled == 0 {
                continue;
            }

            let mut bucket_returns = Vec::with_capacity(q);
            for (bucket, bucket_rows) in members.iter().enumerate() {
                if bucket_rows.is_empty() {
                    bucket_returns.push(None);
                    continue;
                }
                let weight = 1.0 / bucket_rows.len() as f64;
                let mean = bucket_rows.iter().map(|r| r.daily_return).sum::<f64>() * weight;
                bucket_returns.push(Some(mean));
                for row in bucket_rows {
                    positions.insert(date, row.security.clone(), Holding { bucket, weight });
                }
            }
            returns.insert(date, bucket_returns)?;
        }

        info!(
            dates = returns.len(),
            holdings = positions.len(),
            quantiles = q,
            lag = self.config.signal_lag,
            "quantile sort complete"
        );
        Ok(SortResult {
            returns,
            positions,
            diagnostics,
        })
    }

    /// Forward-fill, lag and filter each security's merged sequence, then
    /// regroup the surviving rows by date.
    fn eligible_by_date<'a>(
        &self,
        merged: &'a BTreeMap<SecurityDate, MergedRow>,
    ) -> BTreeMap<Date, Vec<Eligible<'a>>> {
        let lag = self.config.signal_lag;
        let mut by_date: BTreeMap<Date, Vec<Eligible<'a>>> = BTreeMap::new();
        let mut current: Option<&Security> = None;
        let mut market_cap = None;
        let mut probability = None;
        let mut history: VecDeque<Option<f64>> = VecDeque::with_capacity(lag + 1);
        let (mut incomplete, mut out_of_bounds) = (0usize, 0usize);

        for (key, row) in merged {
            if current != Some(&key.security) {
                current = Some(&key.security);
                market_cap = None;
                probability = None;
                history.clear();
            }
            market_cap = row.market_cap.or(market_cap);
            probability = row.probability.or(probability);

            history.push_back(probability);
            let lagged = if history.len() > lag {
                history.pop_front().flatten()
            } else {
                None
            };

            let (Some(probability), Some(daily_return), Some(market_cap)) =
                (lagged, row.daily_return, market_cap)
            else {
                incomplete += 1;
                continue;
            };
            if !self.config.admits(market_cap) {
                out_of_bounds += 1;
                continue;
            }
            by_date.entry(key.date).or_default().push(Eligible {
                security: &key.security,
                probability,
                daily_return,
            });
        }

        debug!(incomplete, out_of_bounds, "dropped rows before ranking");
        by_date
    }
}

/// Outer-merge probabilities onto the price calendar.
fn merge(
    probabilities: &[ProbabilityRow],
    prices: &PriceTable,
) -> BTreeMap<SecurityDate, MergedRow> {
    let mut merged: BTreeMap<SecurityDate, MergedRow> = BTreeMap::new();
    for (security, bar) in prices.iter() {
        merged.insert(
            SecurityDate::new(security.clone(), bar.date),
            MergedRow {
                probability: None,
                market_cap: bar.market_cap,
                daily_return: bar.daily_return,
            },
        );
    }
    for row in probabilities {
        merged
            .entry(SecurityDate::new(row.security.clone(), row.date))
            .or_default()
            .probability = Some(row.probability);
    }
    merged
}

/// Convenience wrapper around [`QuantileSorter::run`].
///
/// # Errors
///
/// See [`QuantileSorter::run`].
pub fn quantile_sort(
    probabilities: &[ProbabilityRow],
    prices: &PriceTable,
    config: SortConfig,
) -> Result<SortResult> {
    QuantileSorter::new(config).run(probabilities, prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tainan_data::PriceBar;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(day: u32, market_cap: f64, daily_return: Option<f64>) -> PriceBar {
        PriceBar {
            daily_return,
            ..PriceBar::from_close(d(day), Some(10.0)).with_market_cap(Some(market_cap))
        }
    }

    fn prob(s: &str, day: u32, p: f64) -> ProbabilityRow {
        ProbabilityRow {
            security: s.into(),
            date: d(day),
            probability: p,
        }
    }

    /// Copy the bars of security "A" to every name in `names`.
    fn prices_for(names: &[&str], prices: &PriceTable) -> PriceTable {
        let bars = prices.series(&Security::from("A")).unwrap_or_default();
        PriceTable::from_bars(
            names
                .iter()
                .flat_map(|s| bars.iter().map(move |b| (Security::from(*s), b.clone()))),
        )
    }

    #[test]
    fn test_quantile_bucket_even_split() {
        let buckets: Vec<usize> = (1..=20)
            .map(|r| quantile_bucket(r, 20, 4).unwrap())
            .collect();
        for b in 0..4 {
            assert_eq!(buckets.iter().filter(|&&x| x == b).count(), 5);
        }
        assert_eq!(buckets[0], 0);
        assert_eq!(buckets[19], 3);
        assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_quantile_bucket_sparse() {
        assert_eq!(quantile_bucket(1, 1, 10), None);
        assert_eq!(quantile_bucket(1, 1, 1), None);
        assert_eq!(quantile_bucket(1, 2, 4), Some(0));
        assert_eq!(quantile_bucket(2, 2, 4), Some(3));
        let three: Vec<Option<usize>> = (1..=3).map(|r| quantile_bucket(r, 3, 10)).collect();
        assert_eq!(three, vec![Some(0), Some(4), Some(9)]);
    }

    #[test]
    fn test_zero_quantiles_rejected() {
        let config = SortConfig {
            quantiles: 0,
            ..SortConfig::default()
        };
        let err = quantile_sort(&[], &PriceTable::default(), config).unwrap_err();
        assert!(matches!(err, TainanError::InvalidData(_)));
    }

    #[test]
    fn test_admits_bounds() {
        let config = SortConfig {
            market_cap_lower: 100.0,
            market_cap_upper: Some(500.0),
            ..SortConfig::default()
        };
        assert!(config.admits(100.0));
        assert!(!config.admits(500.0));
        assert!(!config.admits(99.9));
        assert!(SortConfig::default().admits(f64::MAX));
    }

    #[test]
    fn test_probability_forward_filled_and_lagged() {
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(2, 100.0, Some(0.01))),
            (Security::from("A"), bar(3, 100.0, Some(0.02))),
            (Security::from("A"), bar(4, 100.0, Some(0.03))),
            (Security::from("A"), bar(5, 100.0, None)),
        ]);
        let config = SortConfig {
            quantiles: 1,
            ..SortConfig::default()
        };
        let probs = [prob("A", 2, 0.6), prob("B", 2, 0.4)];
        let result = quantile_sort(&probs, &prices_for(&["A", "B"], &prices), config).unwrap();
        // known at close of 1/2, usable from 1/3; 1/5 has no return
        let dates: Vec<Date> = result.returns.dates().collect();
        assert_eq!(dates, vec![d(3), d(4)]);
        assert_relative_eq!(result.returns.get(d(3), 0).unwrap(), 0.02);
    }

    #[test]
    fn test_release_on_non_trading_day_still_carries() {
        // released on 1/6 (no bar), first usable bar is 1/8
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(5, 100.0, Some(0.01))),
            (Security::from("A"), bar(8, 100.0, Some(0.02))),
        ]);
        let config = SortConfig {
            quantiles: 1,
            ..SortConfig::default()
        };
        let probs = [prob("A", 6, 0.6), prob("B", 6, 0.4)];
        let result = quantile_sort(&probs, &prices_for(&["A", "B"], &prices), config).unwrap();
        assert_eq!(result.returns.dates().collect::<Vec<_>>(), vec![d(8)]);
    }

    #[test]
    fn test_market_cap_forward_filled() {
        let mut missing_cap = bar(3, 0.0, Some(0.02));
        missing_cap.market_cap = None;
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(2, 100.0, Some(0.01))),
            (Security::from("A"), missing_cap),
        ]);
        let config = SortConfig {
            quantiles: 1,
            signal_lag: 0,
            ..SortConfig::default()
        };
        let probs = [prob("A", 2, 0.6), prob("B", 2, 0.4)];
        let result = quantile_sort(&probs, &prices_for(&["A", "B"], &prices), config).unwrap();
        assert_eq!(result.returns.len(), 2);
        assert!(result.diagnostics.iter().all(|d| d.eligible == 2));
    }

    #[test]
    fn test_duplicate_probability_key_keeps_last() {
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(2, 100.0, Some(0.01))),
            (Security::from("B"), bar(2, 100.0, Some(0.02))),
        ]);
        let config = SortConfig {
            quantiles: 2,
            signal_lag: 0,
            ..SortConfig::default()
        };
        let probs = [prob("A", 2, 0.9), prob("B", 2, 0.5), prob("A", 2, 0.1)];
        let result = quantile_sort(&probs, &prices, config).unwrap();
        assert_eq!(result.positions.holding(d(2), &"B".into()).unwrap().bucket, 0);
        assert_eq!(result.positions.holding(d(2), &"A".into()).unwrap().bucket, 1);
    }

    #[test]
    fn test_ties_broken_by_security_order() {
        let prices = PriceTable::from_bars(vec![
            (Security::from("B"), bar(2, 100.0, Some(0.01))),
            (Security::from("A"), bar(2, 100.0, Some(0.02))),
        ]);
        let config = SortConfig {
            quantiles: 2,
            signal_lag: 0,
            ..SortConfig::default()
        };
        let probs = [prob("B", 2, 0.5), prob("A", 2, 0.5)];
        let result = quantile_sort(&probs, &prices, config).unwrap();
        assert_eq!(result.positions.holding(d(2), &"A".into()).unwrap().bucket, 0);
        assert_eq!(result.positions.holding(d(2), &"B".into()).unwrap().bucket, 1);
    }

    #[test]
    fn test_diagnostics_report_sparse_dates() {
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(2, 100.0, Some(0.01))),
            (Security::from("B"), bar(2, 100.0, Some(0.02))),
        ]);
        let config = SortConfig {
            quantiles: 4,
            signal_lag: 0,
            ..SortConfig::default()
        };
        let probs = [prob("A", 2, 0.9), prob("B", 2, 0.5)];
        let result = quantile_sort(&probs, &prices, config).unwrap();
        assert_eq!(
            result.diagnostics,
            vec![SortDiagnostics {
                date: d(2),
                eligible: 2,
                buckets_filled: 2
            }]
        );
        assert_eq!(result.degenerate_dates().count(), 1);
        assert_eq!(result.positions.weight_sums(d(2)), vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(result.returns.get(d(2), 1), None);
    }

    #[test]
    fn test_single_eligible_security_gets_no_bucket() {
        let prices = PriceTable::from_bars(vec![
            (Security::from("A"), bar(2, 100.0, Some(0.0953))),
            (Security::from("A"), bar(3, 100.0, Some(0.01))),
            (Security::from("B"), bar(3, 100.0, Some(0.03))),
        ]);
        let config = SortConfig {
            signal_lag: 0,
            ..SortConfig::default()
        };
        let probs = [prob("A", 2, 0.7), prob("B", 3, 0.2)];
        let result = quantile_sort(&probs, &prices, config).unwrap();

        assert_eq!(result.returns.dates().collect::<Vec<_>>(), vec![d(3)]);
        assert_eq!(result.returns.get(d(2), 0), None);
        assert_eq!(result.positions.holding(d(2), &"A".into()), None);
        assert_eq!(result.positions.weight_sums(d(2)), vec![0.0; 10]);
        assert_eq!(
            result.diagnostics[0],
            SortDiagnostics {
                date: d(2),
                eligible: 1,
                buckets_filled: 0
            }
        );
        assert_eq!(result.degenerate_dates().count(), 2);
        assert_eq!(result.positions.holding(d(3), &"A".into()).unwrap().bucket, 0);
        assert_eq!(result.positions.holding(d(3), &"B".into()).unwrap().bucket, 9);
    }
}
