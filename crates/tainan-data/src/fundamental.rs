//! Seasonal financial statement table.

use crate::encoding::read_cp950;
use crate::table;
use crate::universe::SpecialSecurities;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tainan_traits::{Date, PeriodKey, Result, Security, TainanError};
use tracing::{debug, info};

/// Security column of the fundamental export.
pub const SECURITY_COLUMN: &str = "證券代碼";
/// Statement release date column.
pub const RELEASE_DATE_COLUMN: &str = "財報發布日";
/// Reporting period column (`%Y%m`).
pub const PERIOD_COLUMN: &str = "年月";

/// Bookkeeping columns of the export that carry no numeric feature.
pub const METADATA_COLUMNS: [&str; 10] = [
    "合併(Y/N)",
    "單季(Q)/單半年(H)",
    "月份",
    "季別",
    "幣別",
    "市場別",
    "財報附註TEJ是否完成Y/N",
    "財報類別（1個別2個體3合併）",
    "財報年月起日",
    "財報年月迄日",
];

const RELEASE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// One statement release of one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    /// Security identifier.
    pub security: Security,
    /// Date the statement became public.
    pub release_date: Date,
    /// Fiscal period the statement covers.
    pub period: PeriodKey,
    /// Feature values, aligned with [`FundamentalTable::feature_names`].
    pub values: Vec<Option<f64>>,
}

/// Statement records sorted by `(security, release_date)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundamentalTable {
    feature_names: Vec<String>,
    records: Vec<FundamentalRecord>,
}

impl FundamentalTable {
    /// Build a table, sorting records by security then release date.
    ///
    /// # Errors
    ///
    /// Fails if any record's value count differs from the feature count.
    pub fn new(feature_names: Vec<String>, mut records: Vec<FundamentalRecord>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != feature_names.len()) {
            return Err(TainanError::InvalidData(format!(
                "{} @ {} has {} values for {} features",
                bad.security,
                bad.release_date,
                bad.values.len(),
                feature_names.len()
            )));
        }
        records.sort_by(|a, b| {
            (&a.security, a.release_date).cmp(&(&b.security, b.release_date))
        });
        Ok(Self {
            feature_names,
            records,
        })
    }

    /// Feature column names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Records in `(security, release_date)` order.
    pub fn records(&self) -> &[FundamentalRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a feature column.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|f| f == name)
    }

    /// Keep the first record of every `(security, period)`.
    ///
    /// Restatements re-release an old period; only the original release is
    /// point-in-time.
    pub fn drop_duplicate_periods(&self) -> Self {
        let mut seen: HashSet<(&Security, PeriodKey)> = HashSet::new();
        let records: Vec<FundamentalRecord> = self
            .records
            .iter()
            .filter(|r| seen.insert((&r.security, r.period)))
            .cloned()
            .collect();
        debug!(
            dropped = self.records.len() - records.len(),
            "dropped duplicate statement periods"
        );
        Self {
            feature_names: self.feature_names.clone(),
            records,
        }
    }

    /// Keep only `features`, in that order, renamed to `rename`.
    ///
    /// # Errors
    ///
    /// Fails if the two lists differ in length or a feature is unknown.
    pub fn select_features<S: AsRef<str>, R: AsRef<str>>(
        &self,
        features: &[S],
        rename: &[R],
    ) -> Result<Self> {
        if features.len() != rename.len() {
            return Err(TainanError::InvalidData(format!(
                "{} features but {} new names",
                features.len(),
                rename.len()
            )));
        }
        let idx: Vec<usize> = features
            .iter()
            .map(|f| {
                self.feature_index(f.as_ref())
                    .ok_or_else(|| TainanError::MissingColumn(f.as_ref().to_string()))
            })
            .collect::<Result<_>>()?;
        let records = self
            .records
            .iter()
            .map(|r| FundamentalRecord {
                values: idx.iter().map(|&i| r.values[i]).collect(),
                ..r.clone()
            })
            .collect();
        Ok(Self {
            feature_names: rename.iter().map(|r| r.as_ref().to_string()).collect(),
            records,
        })
    }

    /// Drop every security in the exclusion set.
    pub fn exclude(&self, special: &SpecialSecurities) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            records: self
                .records
                .iter()
                .filter(|r| !special.contains(&r.security))
                .cloned()
                .collect(),
        }
    }

    /// Long-format DataFrame view, one row per record.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![
            Column::new(
                "security".into(),
                self.records
                    .iter()
                    .map(|r| r.security.to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "release_date".into(),
                self.records.iter().map(|r| r.release_date).collect::<Vec<_>>(),
            ),
            Column::new(
                "period".into(),
                self.records
                    .iter()
                    .map(|r| r.period.to_string())
                    .collect::<Vec<_>>(),
            ),
        ];
        for (j, name) in self.feature_names.iter().enumerate() {
            let values: Vec<Option<f64>> = self.records.iter().map(|r| r.values[j]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Parse a decoded fundamental export.
///
/// Every column other than the key and metadata columns is a candidate
/// feature. Columns holding non-numeric text, and columns empty in every row,
/// are dropped.
///
/// # Errors
///
/// Fails if a key column is missing or a key cell cannot be parsed.
pub fn parse_fundamental_csv(text: &str) -> Result<FundamentalTable> {
    let (header, rows) = table::read_rows(text)?;
    let security_idx = header.require(SECURITY_COLUMN)?;
    let release_idx = header.require(RELEASE_DATE_COLUMN)?;
    let period_idx = header.require(PERIOD_COLUMN)?;

    let candidates: Vec<(usize, &str)> = header
        .names()
        .iter()
        .enumerate()
        .filter(|(i, name)| {
            ![security_idx, release_idx, period_idx].contains(i)
                && !METADATA_COLUMNS.contains(&name.as_str())
        })
        .map(|(i, name)| (i, name.as_str()))
        .collect();

    let mut keys = Vec::with_capacity(rows.len());
    let mut columns: Vec<Option<Vec<Option<f64>>>> =
        vec![Some(Vec::with_capacity(rows.len())); candidates.len()];
    for row in &rows {
        let security = Security::new(table::cell(row, security_idx));
        let release_date = table::parse_date(table::cell(row, release_idx), &RELEASE_DATE_FORMATS)?;
        let period: PeriodKey = table::cell(row, period_idx).parse()?;
        keys.push((security, release_date, period));

        for (slot, (idx, _)) in columns.iter_mut().zip(&candidates) {
            if let Some(values) = slot {
                match table::parse_number(table::cell(row, *idx)) {
                    None => values.push(None),
                    Some(Ok(v)) => values.push(Some(v)),
                    Some(Err(_)) => *slot = None,
                }
            }
        }
    }

    let mut feature_names = Vec::new();
    let mut kept = Vec::new();
    for ((_, name), column) in candidates.iter().zip(columns) {
        match column {
            Some(values) if values.iter().any(Option::is_some) => {
                feature_names.push((*name).to_string());
                kept.push(values);
            }
            Some(_) => debug!(column = *name, "dropping empty fundamental column"),
            None => debug!(column = *name, "dropping non-numeric fundamental column"),
        }
    }

    let records = keys
        .into_iter()
        .enumerate()
        .map(|(row, (security, release_date, period))| FundamentalRecord {
            security,
            release_date,
            period,
            values: kept.iter().map(|col| col[row]).collect(),
        })
        .collect();
    FundamentalTable::new(feature_names, records)
}

/// Load a cp950 fundamental export from disk.
pub fn load_fundamental_data(path: impl AsRef<Path>) -> Result<FundamentalTable> {
    let path = path.as_ref();
    let table = parse_fundamental_csv(&read_cp950(path)?)?;
    info!(
        path = %path.display(),
        records = table.len(),
        features = table.feature_names().len(),
        "loaded fundamental data"
    );
    Ok(table)
}
