//! Error types for the tainan workspace.
//!
//! A single error enum is shared by the loaders, the panel builder, the model
//! and the backtest so that the binary can propagate any failure with `?`.

use thiserror::Error;

/// The main error type for tainan operations.
#[derive(Debug, Error)]
pub enum TainanError {
    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from an input file or table.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when a date or period cannot be parsed or is out of range.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error when a security is not present in a table.
    #[error("Security not found: {0}")]
    SecurityNotFound(String),

    /// Error decoding or encoding legacy text.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Error fetching data from external sources.
    #[error("Data fetch error: {0}")]
    DataFetch(String),

    /// Error fitting or evaluating a classifier.
    #[error("Model error: {0}")]
    Model(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for TainanError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for TainanError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for tainan operations.
pub type Result<T> = std::result::Result<T, TainanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TainanError::MissingColumn("收盤價(元)".to_string());
        assert_eq!(err.to_string(), "Missing required column: 收盤價(元)");

        let err = TainanError::Encoding("bad byte".to_string());
        assert_eq!(err.to_string(), "Encoding error: bad byte");
    }

    #[test]
    fn test_error_from_str() {
        let err: TainanError = "boom".into();
        assert!(matches!(err, TainanError::Other(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "price_daily.csv");
        let err: TainanError = io.into();
        assert!(matches!(err, TainanError::Io(_)));
    }
}
