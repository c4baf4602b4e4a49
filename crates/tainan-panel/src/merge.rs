//! Point-in-time merge of statements and prices.
//!
//! Each statement release is paired with the price bar of its release date.
//! The holding period of a release runs from the close after the release
//! (`TMR Close`) to the close just before the next release of the same
//! security (the next row's `YSTD Close`). That ratio is the seasonal return
//! the classifier learns to rank.

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tainan_data::{FundamentalTable, PriceBar, PriceTable};
use tainan_traits::{Date, PeriodKey, Result, Security, TainanError};
use tracing::info;

/// How the seasonal return is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// `exit / entry - 1`
    #[default]
    Simple,
    /// `ln(exit / entry)`
    Log,
}

impl ReturnMode {
    /// Return between `entry` and `exit`; missing unless both are positive.
    pub fn apply(self, exit: Option<f64>, entry: Option<f64>) -> Option<f64> {
        let (exit, entry) = (exit?, entry?);
        if entry <= 0.0 || exit <= 0.0 {
            return None;
        }
        let ratio = exit / entry;
        Some(match self {
            Self::Simple => ratio - 1.0,
            Self::Log => ratio.ln(),
        })
    }
}

/// One statement release joined with its release-day price bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// Security identifier.
    pub security: Security,
    /// Statement release date, also the trading date of `price`.
    pub release_date: Date,
    /// Fiscal period of the statement.
    pub period: PeriodKey,
    /// Feature values aligned with [`Panel::feature_names`].
    pub features: Vec<Option<f64>>,
    /// Price bar on the release date; `None` when the security did not trade.
    pub price: Option<PriceBar>,
    /// Previous close of the security's next release ("YSTD Close Shift").
    pub ystd_close_shift: Option<f64>,
    /// Return from the close after this release to the close before the next.
    pub seasonal_return: Option<f64>,
    /// Median seasonal return of the row's period.
    pub cross_section_median: Option<f64>,
    /// Whether the seasonal return beat the period median.
    pub outperformed: Option<bool>,
}

impl PanelRow {
    /// Close of the trading day after release ("TMR Close").
    pub fn tmr_close(&self) -> Option<f64> {
        self.price.as_ref().and_then(|p| p.next_close)
    }

    /// Close of the trading day before release ("YSTD Close").
    pub fn ystd_close(&self) -> Option<f64> {
        self.price.as_ref().and_then(|p| p.prev_close)
    }
}

/// Statement panel sorted by `(period, security, release_date)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    feature_names: Vec<String>,
    rows: Vec<PanelRow>,
}

impl Panel {
    /// Build a panel from rows in any order.
    ///
    /// # Errors
    ///
    /// Fails if a row's feature count differs from `feature_names`.
    pub fn new(feature_names: Vec<String>, mut rows: Vec<PanelRow>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.features.len() != feature_names.len()) {
            return Err(TainanError::InvalidData(format!(
                "panel row {} @ {} has {} features, expected {}",
                bad.security,
                bad.release_date,
                bad.features.len(),
                feature_names.len()
            )));
        }
        rows.sort_by(|a, b| {
            (a.period, &a.security, a.release_date).cmp(&(b.period, &b.security, b.release_date))
        });
        Ok(Self {
            feature_names,
            rows,
        })
    }

    /// Feature column names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Rows in `(period, security, release_date)` order.
    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the panel is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct periods, ascending.
    pub fn periods(&self) -> Vec<PeriodKey> {
        let mut periods: Vec<PeriodKey> = self.rows.iter().map(|r| r.period).collect();
        periods.dedup();
        periods
    }

    /// Keep only rows whose seasonal return is known.
    ///
    /// The last release of every security has no exit price and must not
    /// reach the classifier.
    pub fn drop_incomplete_returns(&self) -> Self {
        self.filter(|r| r.seasonal_return.is_some())
    }

    /// Keep rows matching `keep`.
    pub fn filter(&self, keep: impl Fn(&PanelRow) -> bool) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Same rows with a new feature set. The caller keeps row order.
    pub(crate) fn replace_features(
        &self,
        feature_names: Vec<String>,
        features: Vec<Vec<Option<f64>>>,
    ) -> Self {
        let rows = self
            .rows
            .iter()
            .zip(features)
            .map(|(row, features)| PanelRow {
                features,
                ..row.clone()
            })
            .collect();
        Self {
            feature_names,
            rows,
        }
    }

    pub(crate) fn with_rows(&self, rows: Vec<PanelRow>) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows,
        }
    }

    /// Dense `rows × features` matrix.
    ///
    /// # Errors
    ///
    /// Fails on the first missing feature value; impute first.
    pub fn feature_matrix(&self) -> Result<Array2<f64>> {
        let n_features = self.feature_names.len();
        let mut matrix = Array2::zeros((self.rows.len(), n_features));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.features.iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| {
                    TainanError::InvalidData(format!(
                        "missing {} for {} @ {}",
                        self.feature_names[j], row.security, row.release_date
                    ))
                })?;
            }
        }
        Ok(matrix)
    }

    /// Outperformance labels (1.0 / 0.0) for every row.
    ///
    /// # Errors
    ///
    /// Fails if a row has not been labelled.
    pub fn label_vector(&self) -> Result<ndarray::Array1<f64>> {
        self.rows
            .iter()
            .map(|r| {
                r.outperformed
                    .map(|o| if o { 1.0 } else { 0.0 })
                    .ok_or_else(|| {
                        TainanError::InvalidData(format!(
                            "unlabelled row {} @ {}",
                            r.security, r.release_date
                        ))
                    })
            })
            .collect()
    }

    /// DataFrame view with keys, features, prices and returns.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let rows = &self.rows;
        let mut columns = vec![
            Column::new(
                "security".into(),
                rows.iter().map(|r| r.security.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                "release_date".into(),
                rows.iter().map(|r| r.release_date).collect::<Vec<_>>(),
            ),
            Column::new(
                "period".into(),
                rows.iter().map(|r| r.period.to_string()).collect::<Vec<_>>(),
            ),
        ];
        for (j, name) in self.feature_names.iter().enumerate() {
            columns.push(Column::new(
                name.as_str().into(),
                rows.iter().map(|r| r.features[j]).collect::<Vec<_>>(),
            ));
        }
        let derived: [(&str, fn(&PanelRow) -> Option<f64>); 6] = [
            ("Close", |r| r.price.as_ref().and_then(|p| p.close)),
            ("YSTD Close", PanelRow::ystd_close),
            ("TMR Close", PanelRow::tmr_close),
            ("YSTD Close Shift", |r| r.ystd_close_shift),
            ("Seasonal Return", |r| r.seasonal_return),
            ("Cross Section Median", |r| r.cross_section_median),
        ];
        for (name, get) in derived {
            columns.push(Column::new(
                name.into(),
                rows.iter().map(get).collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Left-join statements with release-day prices and compute seasonal returns.
///
/// Every statement is kept; price fields are missing when the security did
/// not trade on its release date. Prices must already carry previous and
/// next closes (see [`PriceTable::with_daily_returns`]).
///
/// # Errors
///
/// Propagates panel construction errors.
pub fn build_panel(
    fundamentals: &FundamentalTable,
    prices: &PriceTable,
    mode: ReturnMode,
) -> Result<Panel> {
    let records = fundamentals.records();
    let joined: Vec<Option<PriceBar>> = records
        .iter()
        .map(|r| prices.get(&r.security, r.release_date).cloned())
        .collect();

    let mut rows = Vec::with_capacity(records.len());
    let mut matched = 0usize;
    for (i, record) in records.iter().enumerate() {
        // records are grouped by security and sorted by release date
        let ystd_close_shift = match records.get(i + 1) {
            Some(next) if next.security == record.security => {
                joined[i + 1].as_ref().and_then(|bar| bar.prev_close)
            }
            _ => None,
        };
        let price = joined[i].clone();
        if price.is_some() {
            matched += 1;
        }
        let tmr_close = price.as_ref().and_then(|p| p.next_close);
        rows.push(PanelRow {
            security: record.security.clone(),
            release_date: record.release_date,
            period: record.period,
            features: record.values.clone(),
            price,
            ystd_close_shift,
            seasonal_return: mode.apply(ystd_close_shift, tmr_close),
            cross_section_median: None,
            outperformed: None,
        });
    }

    let panel = Panel::new(fundamentals.feature_names().to_vec(), rows)?;
    info!(
        rows = panel.len(),
        matched,
        with_return = panel.rows().iter().filter(|r| r.seasonal_return.is_some()).count(),
        "built statement panel"
    );
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tainan_data::FundamentalRecord;

    fn d(m: u32, day: u32) -> Date {
        Date::from_ymd_opt(2023, m, day).unwrap()
    }

    fn prices() -> PriceTable {
        let closes = [
            ("A", d(5, 14), 9.0),
            ("A", d(5, 15), 10.0),
            ("A", d(5, 16), 11.0),
            ("A", d(8, 13), 14.0),
            ("A", d(8, 14), 15.0),
            ("A", d(8, 15), 16.0),
            ("B", d(5, 15), 20.0),
            ("B", d(5, 16), 22.0),
        ];
        PriceTable::from_bars(
            closes
                .iter()
                .map(|(s, date, c)| (Security::from(*s), PriceBar::from_close(*date, Some(*c)))),
        )
        .with_daily_returns()
    }

    fn fundamentals() -> FundamentalTable {
        let rec = |s: &str, date: Date, period: &str, v: f64| FundamentalRecord {
            security: s.into(),
            release_date: date,
            period: period.parse().unwrap(),
            values: vec![Some(v)],
        };
        FundamentalTable::new(
            vec!["roe".to_string()],
            vec![
                rec("A", d(8, 14), "202306", 2.0),
                rec("A", d(5, 15), "202303", 1.0),
                rec("B", d(5, 15), "202303", 3.0),
                // B has no bar on this date
                rec("B", d(8, 14), "202306", 4.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_seasonal_return_uses_next_release_ystd_close() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Simple).unwrap();
        let a_q1 = panel
            .rows()
            .iter()
            .find(|r| r.security.as_str() == "A" && r.period.month() == 3)
            .unwrap();
        // entry: close after 5/15 = 11, exit: close before 8/14 = 14
        assert_eq!(a_q1.tmr_close(), Some(11.0));
        assert_eq!(a_q1.ystd_close_shift, Some(14.0));
        assert_relative_eq!(a_q1.seasonal_return.unwrap(), 14.0 / 11.0 - 1.0);
    }

    #[test]
    fn test_log_mode() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Log).unwrap();
        let a_q1 = &panel.rows()[0];
        assert_eq!(a_q1.security.as_str(), "A");
        assert_relative_eq!(a_q1.seasonal_return.unwrap(), (14.0_f64 / 11.0).ln());
    }

    #[test]
    fn test_left_join_keeps_unmatched_and_last_release_has_no_return() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Simple).unwrap();
        assert_eq!(panel.len(), 4);

        let b_q2 = panel
            .rows()
            .iter()
            .find(|r| r.security.as_str() == "B" && r.period.month() == 6)
            .unwrap();
        assert!(b_q2.price.is_none());
        assert_eq!(b_q2.seasonal_return, None);

        // B's first release: next release has no price bar → no exit price
        let b_q1 = &panel.rows()[1];
        assert_eq!(b_q1.security.as_str(), "B");
        assert_eq!(b_q1.seasonal_return, None);

        // A's last release: end of history
        let a_q2 = &panel.rows()[2];
        assert_eq!(a_q2.security.as_str(), "A");
        assert_eq!(a_q2.ystd_close_shift, None);
        assert_eq!(a_q2.seasonal_return, None);

        assert_eq!(panel.drop_incomplete_returns().len(), 1);
    }

    #[test]
    fn test_sorted_by_period() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Simple).unwrap();
        let periods: Vec<String> = panel.rows().iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["2023-03", "2023-03", "2023-06", "2023-06"]);
        assert_eq!(panel.periods().len(), 2);
    }

    #[test]
    fn test_return_mode_guards() {
        assert_eq!(ReturnMode::Simple.apply(Some(1.0), Some(0.0)), None);
        assert_eq!(ReturnMode::Log.apply(None, Some(1.0)), None);
        assert_relative_eq!(ReturnMode::Simple.apply(Some(3.0), Some(2.0)).unwrap(), 0.5);
        let json = serde_json::to_string(&ReturnMode::Log).unwrap();
        assert_eq!(json, "\"log\"");
    }

    #[test]
    fn test_feature_matrix_requires_complete_rows() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Simple).unwrap();
        let x = panel.feature_matrix().unwrap();
        assert_eq!(x.dim(), (4, 1));
        assert_eq!(x[[0, 0]], 1.0);

        let mut rows = panel.rows().to_vec();
        rows[0].features[0] = None;
        let broken = panel.with_rows(rows);
        assert!(broken.feature_matrix().is_err());
        assert!(panel.label_vector().is_err());
    }

    #[test]
    fn test_to_frame() {
        let panel = build_panel(&fundamentals(), &prices(), ReturnMode::Simple).unwrap();
        let df = panel.to_frame().unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 3 + 1 + 6);
    }
}
