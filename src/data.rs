use std::{fmt, sync::LazyLock};

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float regex")
});

static INT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(?:0[xX]([0-9a-fA-F]+)|(\d+))").expect("valid int regex")
});

/// A raw cell as it arrives in a file's column summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl RawValue {
    pub fn as_display(&self) -> String {
        match self {
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) => format_number(*f),
            RawValue::String(s) => s.clone(),
            RawValue::Null => "null".to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The cell unchanged, for columns without a recognised type.
    pub fn passthrough(&self) -> Option<Value> {
        match self {
            RawValue::Boolean(b) => Some(Value::Boolean(*b)),
            RawValue::Integer(i) => Some(Value::Integer(*i)),
            RawValue::Float(f) => Some(Value::Float(*f)),
            RawValue::String(s) => Some(Value::String(s.clone())),
            RawValue::Null => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

/// A transformed cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_number(*f),
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => format_datetime(dt),
        }
    }

    /// Integral finite results become `Integer`, everything else stays `Float`.
    pub fn from_number(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Value::Integer(value as i64)
        } else {
            Value::Float(value)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Renders a number the way JavaScript's `String(x)` does: integral values
/// without a fractional part, `-0` as `0`, exponent notation below `1e-6` and
/// from `1e21` up.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if (1e-6..1e21).contains(&value.abs()) {
        return value.to_string();
    }
    let exponent = format!("{value:e}");
    match exponent.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exponent,
    }
}

pub fn format_json_number(value: &serde_json::Number) -> String {
    if let Some(i) = value.as_i64() {
        i.to_string()
    } else if let Some(u) = value.as_u64() {
        u.to_string()
    } else {
        value.as_f64().map(format_number).unwrap_or_default()
    }
}

/// Whole-string numeric parse. Blank input is zero; anything that is not a
/// finite number yields `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Leading-prefix float parse: `"3.5V"` is `3.5`, `"V3"` is `None`.
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let matched = FLOAT_PREFIX.find(trimmed)?;
    matched
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// Leading-prefix integer parse: `"12.9"` is `12`, `"0x1f"` is `31`.
pub fn parse_int_prefix(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let captures = INT_PREFIX.captures(trimmed)?;
    let negative = captures.get(1).is_some_and(|m| m.as_str() == "-");
    let magnitude = if let Some(hex) = captures.get(2) {
        i128::from_str_radix(hex.as_str(), 16).ok()? as f64
    } else {
        captures.get(3)?.as_str().parse::<f64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a timestamp. Offsets are honoured; naive values are taken as UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = parse_naive_datetime(trimmed) {
        return Ok(Utc.from_utc_datetime(&parsed));
    }
    if let Ok(parsed) = parse_naive_date(trimmed)
        && let Some(midnight) = parsed.and_hms_opt(0, 0, 0)
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(anyhow!("Failed to parse '{value}' as timestamp"))
}

/// Milliseconds since the Unix epoch.
pub fn datetime_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_accepts_whole_numeric_strings_only() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" 1.5e2 "), Some(150.0));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("0x1A"), Some(26.0));
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn parse_float_prefix_reads_leading_number() {
        assert_eq!(parse_float_prefix("3.5V"), Some(3.5));
        assert_eq!(parse_float_prefix("  -.25"), Some(-0.25));
        assert_eq!(parse_float_prefix("1e3 s"), Some(1000.0));
        assert_eq!(parse_float_prefix("V3"), None);
        assert_eq!(parse_float_prefix("true"), None);
    }

    #[test]
    fn parse_int_prefix_truncates() {
        assert_eq!(parse_int_prefix("12.9"), Some(12.0));
        assert_eq!(parse_int_prefix("-7 cycles"), Some(-7.0));
        assert_eq!(parse_int_prefix("0x1f"), Some(31.0));
        assert_eq!(parse_int_prefix("1e3"), Some(1.0));
        assert_eq!(parse_int_prefix("abc"), None);
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1000.0), "1000");
    }

    #[test]
    fn format_number_switches_to_exponents_at_js_thresholds() {
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-2.5e-8), "-2.5e-8");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e300), "1.5e+300");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn parse_datetime_supports_offsets_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 4, 10, 15, 43, 20).unwrap();
        assert_eq!(parse_datetime("2024-04-10T15:43:20Z").unwrap(), expected);
        assert_eq!(
            parse_datetime("2024-04-10T17:43:20+02:00").unwrap(),
            expected
        );
        assert_eq!(parse_datetime("2024-04-10 15:43:20").unwrap(), expected);
        assert_eq!(
            parse_datetime("2024-04-10").unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap()
        );
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn format_datetime_uses_millisecond_rfc3339() {
        let dt = datetime_from_millis(1_712_763_800_522.0).unwrap();
        assert_eq!(format_datetime(&dt), "2024-04-10T15:43:20.522Z");
    }

    #[test]
    fn raw_values_deserialize_untagged() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[true, 3, 1.5, "x", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                RawValue::Boolean(true),
                RawValue::Integer(3),
                RawValue::Float(1.5),
                RawValue::String("x".to_string()),
                RawValue::Null,
            ]
        );
    }

    #[test]
    fn value_from_number_prefers_integers() {
        assert_eq!(Value::from_number(1000.0), Value::Integer(1000));
        assert_eq!(Value::from_number(0.5), Value::Float(0.5));
    }
}
