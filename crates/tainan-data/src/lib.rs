//! Loaders for the Taiwanese equity exports used by tainan.
//!
//! Two vendor files feed the pipeline, both in code page 950:
//!
//! - a seasonal fundamental export keyed by security and statement release
//!   date ([`load_fundamental_data`])
//! - a daily price export keyed by security and trading date
//!   ([`load_price_data`])
//!
//! Headers are trimmed and the Chinese price headers are mapped to canonical
//! names (Open, High, Low, Close, Volume, QuoteVolume, MarketCap).
//!
//! # Example
//!
//! ```rust,ignore
//! use tainan_data::{load_fundamental_data, load_price_data, SpecialSecurities};
//!
//! let special = SpecialSecurities::default();
//! let price = load_price_data("data/price_daily.csv")?
//!     .exclude(&special)
//!     .with_daily_returns();
//! let fundamentals = load_fundamental_data("data/ifrs.csv")?
//!     .exclude(&special)
//!     .drop_duplicate_periods();
//! ```

pub mod encoding;
pub mod fundamental;
pub mod price;
mod table;
pub mod universe;

pub use encoding::{decode_cp950, encode_cp950, read_cp950, write_cp950};
pub use fundamental::{
    FundamentalRecord, FundamentalTable, load_fundamental_data, parse_fundamental_csv,
};
pub use price::{PriceBar, PriceTable, load_price_data, log_return, parse_price_csv};
pub use universe::{PREFERRED_SHARES, SpecialSecurities};
