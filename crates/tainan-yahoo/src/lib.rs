//! Yahoo Finance chart client for tainan.
//!
//! Fetches daily adjusted closes for the benchmark series reported next to
//! the long-short portfolio: the TAIEX index (`^TWII`), the 0050 ETF and the
//! inverse 00632R ETF.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use tainan_yahoo::YahooClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = YahooClient::from_env()?;
//!     let start = NaiveDate::from_ymd_opt(2015, 5, 15).unwrap();
//!     let end = chrono::Local::now().date_naive();
//!     let taiex = client.adjusted_closes("^TWII", start, end).await?;
//!     println!("{} closes", taiex.len());
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! `TAINAN_YAHOO_URL` overrides the API host, read from the environment or a
//! `.env` file:
//!
//! ```bash
//! TAINAN_YAHOO_URL=http://localhost:8080
//! ```

mod client;
mod error;
mod types;

pub use client::{BASE_URL_ENV, BENCHMARKS, YahooClient, default_start, fetch_benchmarks};
pub use error::YahooError;
pub use types::*;

/// Result type for Yahoo operations.
pub type Result<T> = std::result::Result<T, YahooError>;
