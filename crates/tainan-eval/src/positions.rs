//! Per-date bucket membership and equal weights.
//!
//! Every eligible `(date, security)` holds exactly one bucket with weight
//! `1 / population`; its weight in every other bucket is zero.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tainan_data::{encode_cp950, write_cp950};
use tainan_traits::{Date, Result, Security, TainanError};
use tracing::info;

/// Bucket assignment of one security on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Bucket index, 0 = highest probability.
    pub bucket: usize,
    /// Equal weight within the bucket.
    pub weight: f64,
}

/// A security's weight in one bucket on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Trading date.
    pub date: Date,
    /// Security identifier.
    pub security: Security,
    /// Weight in the requested bucket, zero when held elsewhere.
    pub weight: f64,
}

/// Bucket holdings keyed by date, then security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTable {
    n_buckets: usize,
    holdings: BTreeMap<Date, BTreeMap<Security, Holding>>,
}

impl PositionTable {
    /// An empty table with `n_buckets` buckets.
    pub const fn new(n_buckets: usize) -> Self {
        Self {
            n_buckets,
            holdings: BTreeMap::new(),
        }
    }

    /// Record a holding, replacing any earlier one for the same key.
    pub(crate) fn insert(&mut self, date: Date, security: Security, holding: Holding) {
        self.holdings
            .entry(date)
            .or_default()
            .insert(security, holding);
    }

    /// Number of buckets.
    pub const fn n_buckets(&self) -> usize {
        self.n_buckets
    }

    /// Dates with at least one holding.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.holdings.keys().copied()
    }

    /// Number of `(date, security)` holdings.
    pub fn len(&self) -> usize {
        self.holdings.values().map(BTreeMap::len).sum()
    }

    /// Whether there are no holdings.
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Holding of `security` on `date`.
    pub fn holding(&self, date: Date, security: &Security) -> Option<Holding> {
        self.holdings.get(&date)?.get(security).copied()
    }

    /// Weight of `security` in `bucket` on `date`; zero if held elsewhere or
    /// not eligible.
    pub fn weight(&self, date: Date, security: &Security, bucket: usize) -> f64 {
        self.holding(date, security)
            .filter(|h| h.bucket == bucket)
            .map_or(0.0, |h| h.weight)
    }

    /// Total weight per bucket on `date`.
    ///
    /// Filled buckets sum to 1.0 and absent buckets to 0.0.
    pub fn weight_sums(&self, date: Date) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_buckets];
        if let Some(day) = self.holdings.get(&date) {
            for holding in day.values() {
                sums[holding.bucket] += holding.weight;
            }
        }
        sums
    }

    fn check_bucket(&self, bucket: usize) -> Result<()> {
        if bucket < self.n_buckets {
            Ok(())
        } else {
            Err(TainanError::InvalidData(format!(
                "bucket {bucket} out of range for {} buckets",
                self.n_buckets
            )))
        }
    }

    /// Members of `bucket` on `date`, in security order.
    ///
    /// # Errors
    ///
    /// Fails if `bucket` is out of range.
    pub fn positions_at(&self, bucket: usize, date: Date) -> Result<Vec<Position>> {
        self.check_bucket(bucket)?;
        Ok(self
            .holdings
            .get(&date)
            .into_iter()
            .flatten()
            .filter(|(_, h)| h.bucket == bucket && h.weight > 0.0)
            .map(|(security, h)| Position {
                date,
                security: security.clone(),
                weight: h.weight,
            })
            .collect())
    }

    /// Weight of `security` in `bucket` on every date it was eligible,
    /// zeros included.
    ///
    /// # Errors
    ///
    /// Fails if `bucket` is out of range or the security never appears.
    pub fn positions_for_security(
        &self,
        bucket: usize,
        security: &Security,
    ) -> Result<Vec<Position>> {
        self.check_bucket(bucket)?;
        let positions: Vec<Position> = self
            .holdings
            .iter()
            .filter_map(|(date, day)| {
                day.get(security).map(|h| Position {
                    date: *date,
                    security: security.clone(),
                    weight: if h.bucket == bucket { h.weight } else { 0.0 },
                })
            })
            .collect();
        if positions.is_empty() {
            return Err(TainanError::SecurityNotFound(security.to_string()));
        }
        Ok(positions)
    }

    /// Long-format DataFrame: `date`, `security`, then one weight column per
    /// bucket.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let rows: Vec<(Date, &Security, Holding)> = self
            .holdings
            .iter()
            .flat_map(|(date, day)| day.iter().map(move |(s, h)| (*date, s, *h)))
            .collect();
        let mut columns = vec![
            Column::new("date".into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(
                "security".into(),
                rows.iter().map(|r| r.1.to_string()).collect::<Vec<_>>(),
            ),
        ];
        for bucket in 0..self.n_buckets {
            columns.push(Column::new(
                bucket.to_string().into(),
                rows.iter()
                    .map(|r| if r.2.bucket == bucket { r.2.weight } else { 0.0 })
                    .collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Two-column frame of a bucket snapshot: `證券代碼` and the bucket index.
pub fn positions_frame(positions: &[Position], bucket: usize) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new(
            "證券代碼".into(),
            positions
                .iter()
                .map(|p| p.security.to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            bucket.to_string().into(),
            positions.iter().map(|p| p.weight).collect::<Vec<_>>(),
        ),
    ])?)
}

fn positions_csv(positions: &[Position], bucket: usize) -> Result<String> {
    let mut frame = positions_frame(positions, bucket)?;
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut frame)?;
    String::from_utf8(buf).map_err(|e| TainanError::Encoding(e.to_string()))
}

/// Render a bucket snapshot as cp950 delimited text.
///
/// # Errors
///
/// Fails if a security label has no cp950 representation.
pub fn render_positions(positions: &[Position], bucket: usize) -> Result<Vec<u8>> {
    encode_cp950(&positions_csv(positions, bucket)?)
}

/// Write a bucket snapshot to `path` as cp950 delimited text.
///
/// # Errors
///
/// Fails on encoding or I/O errors.
pub fn export_positions(
    positions: &[Position],
    bucket: usize,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    write_cp950(path, &positions_csv(positions, bucket)?)?;
    info!(path = %path.display(), rows = positions.len(), bucket, "exported positions");
    Ok(())
}
