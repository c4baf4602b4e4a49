//! Data loading utilities for the tainan CLI.

use crate::config::{BenchmarkConfig, DataConfig};
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use tainan::data::{
    FundamentalTable, PriceTable, SpecialSecurities, load_fundamental_data, load_price_data,
};
use tainan::eval::Benchmark;
use tainan::yahoo::{BENCHMARKS, YahooClient, default_start};
use tainan::{Security, TainanError};
use tracing::{info, warn};

/// Cleaned input tables.
#[derive(Debug, Clone)]
pub(crate) struct Inputs {
    pub(crate) fundamentals: FundamentalTable,
    pub(crate) prices: PriceTable,
}

/// Exclusion set described by the configuration.
pub(crate) fn special_securities(config: &DataConfig) -> SpecialSecurities {
    let mut special = if config.keep_preferred {
        SpecialSecurities::empty()
    } else {
        SpecialSecurities::default()
    };
    special.extend(config.exclude.iter().map(Security::new));
    special
}

/// Load both exports, drop special securities and attach daily returns.
///
/// Statements repeating a fiscal period keep their first release.
pub(crate) fn load_inputs(config: &DataConfig) -> Result<Inputs> {
    let special = special_securities(config);

    let mut tables = Vec::with_capacity(config.prices.len());
    for path in &config.prices {
        let table = load_price_data(path)
            .with_context(|| format!("loading prices from {}", path.display()))?;
        info!(path = %path.display(), rows = table.len(), "loaded price export");
        tables.push(table);
    }
    let prices = PriceTable::combine(tables).exclude(&special).with_daily_returns();

    let fundamentals = load_fundamental_data(&config.fundamentals)
        .with_context(|| format!("loading fundamentals from {}", config.fundamentals.display()))?
        .exclude(&special)
        .drop_duplicate_periods();

    info!(
        securities = prices.n_securities(),
        bars = prices.len(),
        statements = fundamentals.len(),
        excluded = special.len(),
        "inputs ready"
    );
    Ok(Inputs {
        fundamentals,
        prices,
    })
}

/// Fetch the default benchmarks. A series that fails to download is
/// skipped with a warning.
///
/// `last` is the final portfolio date; the window runs a week past it so
/// the last forward return has a next close.
pub(crate) async fn load_benchmarks(
    config: &BenchmarkConfig,
    last: Option<NaiveDate>,
) -> Result<Vec<Benchmark>> {
    let client = YahooClient::from_env()?;
    let start = config.start.unwrap_or_else(default_start);
    let end = config
        .end
        .or_else(|| last.and_then(|d| d.checked_add_days(Days::new(7))))
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut benchmarks = Vec::with_capacity(BENCHMARKS.len());
    for (label, symbol) in BENCHMARKS {
        match client.adjusted_closes(symbol, start, end).await {
            Ok(history) => {
                info!(symbol, closes = history.len(), "fetched benchmark");
                benchmarks.push(Benchmark::new(label, history.closes));
            }
            Err(e) => warn!(symbol, error = %e, "skipping benchmark"),
        }
    }
    Ok(benchmarks)
}

/// Parse a date string in YYYY-MM-DD format.
pub(crate) fn parse_date(date_str: &str) -> Result<NaiveDate, TainanError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| TainanError::InvalidDate(format!("{date_str:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date("invalid").is_err());
        assert!(parse_date("2024/01/15").is_err());
    }

    #[test]
    fn test_special_securities() {
        let mut config = DataConfig::default();
        let preferred = Security::from("2881A 富邦特");
        assert!(special_securities(&config).contains(&preferred));

        config.keep_preferred = true;
        config.exclude = vec!["1101 台泥".to_string()];
        let special = special_securities(&config);
        assert!(!special.contains(&preferred));
        assert!(special.contains(&Security::from("1101 台泥")));
        assert_eq!(special.len(), 1);
    }

    #[test]
    fn test_load_inputs_missing_file() {
        let config = DataConfig {
            prices: vec!["does/not/exist.csv".into()],
            ..DataConfig::default()
        };
        let err = load_inputs(&config).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.csv"));
    }
}
