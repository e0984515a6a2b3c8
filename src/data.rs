use std::fmt;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single bound parameter or fetched field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

/// Tokens that spreadsheet and dataframe exports write in place of a missing value.
pub fn is_null_marker(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "nan" | "nat" | "none" | "null" | "na" | "n/a" | "<na>"
    )
}

/// Trims the cell and maps null markers to `None`.
pub fn clean_cell(value: Option<&str>) -> Option<&str> {
    value
        .filter(|raw| !is_null_marker(raw))
        .map(|raw| raw.trim())
}

/// Keeps at most `width` characters of `value`.
pub fn truncate(value: &str, width: usize) -> String {
    match value.char_indices().nth(width) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}

/// Parses integer text, accepting integral floats such as `"12.0"`.
pub fn parse_integer(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Ok(parsed);
    }
    let float: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("Failed to parse '{value}' as integer"))?;
    if !float.is_finite() || float.fract() != 0.0 {
        bail!("'{value}' is not a whole number");
    }
    if float < i64::MIN as f64 || float > i64::MAX as f64 {
        bail!("'{value}' is out of integer range");
    }
    Ok(float as i64)
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%d.%m.%Y",
    ];
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = parse_naive_datetime_only(trimmed) {
        return Ok(parsed.date());
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(parsed) = parse_naive_datetime_only(trimmed) {
        return Ok(parsed);
    }
    const DATE_ONLY: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];
    for fmt in DATE_ONLY {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed.and_time(NaiveTime::MIN));
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

fn parse_naive_datetime_only(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M",
        "%d/%m/%Y %H:%M",
    ];
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_markers_are_case_insensitive() {
        for marker in ["", "   ", "NaN", "nan", "NaT", "None", "NULL", "N/A", "na", "<NA>"] {
            assert!(is_null_marker(marker), "{marker:?} should be null");
        }
        assert!(!is_null_marker("0"));
        assert!(!is_null_marker("Nancy"));
    }

    #[test]
    fn clean_cell_trims_surrounding_whitespace() {
        assert_eq!(clean_cell(Some("  Delhi ")), Some("Delhi"));
        assert_eq!(clean_cell(Some(" nan ")), None);
        assert_eq!(clean_cell(None), None);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("éàü€", 2), "éà");
    }

    #[test]
    fn parse_integer_accepts_integral_floats() {
        assert_eq!(parse_integer("42").unwrap(), 42);
        assert_eq!(parse_integer(" 7 ").unwrap(), 7);
        assert_eq!(parse_integer("12.0").unwrap(), 12);
        assert!(parse_integer("12.5").is_err());
        assert!(parse_integer("twelve").is_err());
        assert!(parse_integer("inf").is_err());
    }

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("05/06/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("05-06-2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
        assert_eq!(parse_naive_date("2024-05-06 13:45:00").unwrap(), expected);
        assert!(parse_naive_date("next tuesday").is_err());
    }

    #[test]
    fn ambiguous_slash_dates_read_month_first() {
        assert_eq!(
            parse_naive_date("03/04/2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert_eq!(
            parse_naive_date("17/03/2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 17).unwrap()
        );
        assert_eq!(
            parse_naive_datetime("03/04/2025 08:00").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn parse_naive_datetime_supports_multiple_formats() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-06 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_naive_datetime("2024-05-06T14:30:00").unwrap(), expected);
        assert_eq!(parse_naive_datetime("05/06/2024 14:30:00").unwrap(), expected);
        assert_eq!(parse_naive_datetime("2024-05-06 14:30").unwrap(), expected);
        assert_eq!(parse_naive_datetime("2024-05-06T14:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_naive_datetime("2024-05-06").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_naive_datetime("2024-13-45 99:00").is_err());
    }

    #[test]
    fn value_display_uses_iso_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(Value::Date(date).as_display(), "2025-03-01");
        assert_eq!(
            Value::DateTime(date.and_hms_opt(9, 5, 0).unwrap()).as_display(),
            "2025-03-01 09:05:00"
        );
        assert_eq!(Value::Null.as_display(), "");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
