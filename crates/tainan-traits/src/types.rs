//! Common types used throughout the tainan workspace.
//!
//! Securities, trading dates and reporting periods are kept as distinct types
//! so that a release date can never be confused with a period bucket.

use crate::{Result, TainanError};
use chrono::Datelike;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A listed security, identified by its export label (e.g. `2882 國泰金`).
///
/// The label is opaque: two securities are the same only if their labels are
/// byte-identical. Ordering is lexicographic on the label, which is also the
/// tie-break order used when ranking a cross-section.
#[derive(
    Debug, Display, From, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Security(String);

impl Security {
    /// Creates a security from its label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the full label.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric code, i.e. the label up to the first whitespace.
    ///
    /// ```
    /// use tainan_traits::Security;
    ///
    /// assert_eq!(Security::new("2882 國泰金").code(), "2882");
    /// assert_eq!(Security::new("0050").code(), "0050");
    /// ```
    pub fn code(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or("")
    }
}

impl From<&str> for Security {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl AsRef<str> for Security {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Year-month bucket used to align and de-duplicate seasonal statements.
///
/// Serialized as its `YYYY-MM` display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    /// Creates a period key, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(TainanError::InvalidDate(format!(
                "month {month} out of range for period {year}"
            )));
        }
        Ok(Self { year, month })
    }

    /// January of `year`.
    pub const fn start_of_year(year: i32) -> Self {
        Self { year, month: 1 }
    }

    /// The period containing a calendar date.
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, `1..=12`.
    pub const fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = TainanError;

    /// Parses `YYYYMM` (export format) or `YYYY-MM` (display format).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = match (s.len(), s.split_once('-')) {
            (_, Some((y, m))) => (y, m),
            (6, None) if s.is_ascii() => s.split_at(4),
            _ => return Err(TainanError::InvalidDate(format!("bad period key: {s:?}"))),
        };
        let year: i32 = year
            .parse()
            .map_err(|_| TainanError::InvalidDate(format!("bad period year: {s:?}")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| TainanError::InvalidDate(format!("bad period month: {s:?}")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = TainanError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(period: PeriodKey) -> Self {
        period.to_string()
    }
}

/// Composite `(Security, Date)` key.
///
/// Field order makes the derived ordering group by security first, so a
/// `BTreeMap<SecurityDate, _>` iterates each security's history
/// chronologically before moving on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SecurityDate {
    /// Security identifier.
    pub security: Security,
    /// Observation date.
    pub date: Date,
}

impl SecurityDate {
    /// Creates a new composite key.
    pub const fn new(security: Security, date: Date) -> Self {
        Self { security, date }
    }
}

/// A classifier output: probability that `security` outperforms, as known at
/// the close of `date`.
///
/// The value may not be traded on until the next trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityRow {
    /// Security identifier.
    pub security: Security,
    /// Date the probability becomes known (a statement release date).
    pub date: Date,
    /// Predicted probability of outperformance.
    pub probability: f64,
}
