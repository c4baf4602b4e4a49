//! Header lookup and cell parsing shared by the export readers.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use tainan_traits::{Date, Result, TainanError};

/// Column positions of a trimmed header row.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    pub(crate) fn new(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|h| h.trim().to_string()).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // first occurrence wins on repeated headers
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| TainanError::MissingColumn(name.to_string()))
    }
}

/// Read all rows of a decoded export. Surrounding whitespace is trimmed.
pub(crate) fn read_rows(text: &str) -> Result<(Header, Vec<StringRecord>)> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header = Header::new(reader.headers()?);
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((header, rows))
}

/// Cell text, empty when the row is short.
pub(crate) fn cell<'a>(row: &'a StringRecord, idx: usize) -> &'a str {
    row.get(idx).unwrap_or("")
}

/// Parse an optional number. Blank cells and the vendor's `-` placeholder are
/// missing; thousands separators are ignored.
pub(crate) fn parse_number(raw: &str) -> Option<std::result::Result<f64, String>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    Some(cleaned.parse::<f64>().map_err(|_| raw.to_string()))
}

/// Like [`parse_number`] but turns a bad cell into an error naming its place.
pub(crate) fn number_at(row: &StringRecord, idx: usize, column: &str, line: usize) -> Result<Option<f64>> {
    parse_number(cell(row, idx))
        .transpose()
        .map_err(|raw| {
            TainanError::InvalidData(format!(
                "row {line}, column {column}: not a number: {raw:?}"
            ))
        })
}

/// Parse a date in any of the given formats. A trailing time part is ignored.
pub(crate) fn parse_date(raw: &str, formats: &[&str]) -> Result<Date> {
    let day = raw.split_whitespace().next().unwrap_or("");
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .ok_or_else(|| TainanError::InvalidDate(format!("cannot parse date {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_trimmed() {
        let (header, rows) = read_rows(" 證券代碼 , 年月日 \n1101 台泥,20240102\n").unwrap();
        assert_eq!(header.names(), &["證券代碼".to_string(), "年月日".to_string()]);
        assert_eq!(header.require("年月日").unwrap(), 1);
        assert!(header.require("收盤價(元)").is_err());
        assert_eq!(cell(&rows[0], 0), "1101 台泥");
        assert_eq!(cell(&rows[0], 5), "");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("1,234.5"), Some(Ok(1234.5)));
        assert!(matches!(parse_number("abc"), Some(Err(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        let formats = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
        let expected = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        assert_eq!(parse_date("2023/03/31", &formats).unwrap(), expected);
        assert_eq!(parse_date("20230331", &formats).unwrap(), expected);
        assert_eq!(parse_date("2023-03-31 00:00:00", &formats).unwrap(), expected);
        assert!(parse_date("31.03.2023", &formats).is_err());
    }
}
