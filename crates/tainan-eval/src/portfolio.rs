//! Daily equal-weighted bucket returns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tainan_traits::{Date, Result, TainanError};

/// Mean daily return of every bucket on every sorted date.
///
/// A bucket with no members on a date is `None` for that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileReturns {
    n_buckets: usize,
    by_date: BTreeMap<Date, Vec<Option<f64>>>,
}

impl QuantileReturns {
    /// An empty table with `n_buckets` buckets.
    pub const fn new(n_buckets: usize) -> Self {
        Self {
            n_buckets,
            by_date: BTreeMap::new(),
        }
    }

    /// Record one date's bucket returns.
    ///
    /// # Errors
    ///
    /// Fails if `returns` does not have one entry per bucket.
    pub fn insert(&mut self, date: Date, returns: Vec<Option<f64>>) -> Result<()> {
        if returns.len() != self.n_buckets {
            return Err(TainanError::InvalidData(format!(
                "{} bucket returns on {date}, expected {}",
                returns.len(),
                self.n_buckets
            )));
        }
        self.by_date.insert(date, returns);
        Ok(())
    }

    /// Number of buckets.
    pub const fn n_buckets(&self) -> usize {
        self.n_buckets
    }

    /// Sorted dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.by_date.keys().copied()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    /// Whether no date was sorted.
    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Return of `bucket` on `date`.
    pub fn get(&self, date: Date, bucket: usize) -> Option<f64> {
        self.by_date.get(&date)?.get(bucket).copied().flatten()
    }

    /// One bucket's return on every date.
    ///
    /// # Errors
    ///
    /// Fails if `bucket` is out of range.
    pub fn bucket_series(&self, bucket: usize) -> Result<Vec<Option<f64>>> {
        self.check_bucket(bucket)?;
        Ok(self.by_date.values().map(|r| r[bucket]).collect())
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

    /// DataFrame with a `date` column and one column per bucket (`"0"`, `"1"`, ...).
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new(
            "date".into(),
            self.by_date.keys().copied().collect::<Vec<_>>(),
        )];
        for bucket in 0..self.n_buckets {
            columns.push(Column::new(
                bucket.to_string().into(),
                self.by_date.values().map(|r| r[bucket]).collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut q = QuantileReturns::new(2);
        q.insert(d(5), vec![Some(0.01), None]).unwrap();
        q.insert(d(4), vec![Some(0.02), Some(-0.01)]).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.dates().collect::<Vec<_>>(), vec![d(4), d(5)]);
        assert_eq!(q.get(d(5), 1), None);
        assert_eq!(q.get(d(4), 1), Some(-0.01));
        assert_eq!(q.bucket_series(0).unwrap(), vec![Some(0.02), Some(0.01)]);
        assert!(q.bucket_series(2).is_err());
        assert!(q.insert(d(6), vec![None]).is_err());
    }

    #[test]
    fn test_to_frame() {
        let mut q = QuantileReturns::new(3);
        q.insert(d(4), vec![Some(0.01), None, Some(0.03)]).unwrap();
        let df = q.to_frame().unwrap();
        assert_eq!(df.shape(), (1, 4));
        assert_eq!(df.column("1").unwrap().null_count(), 1);
    }
}
