// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

/// A single resolved cell. Rows are opaque; every processor works on the
/// values an accessor pulls out of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(OffsetDateTime),
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, empty text, or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(value) => value.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::Text(value) => value.clone(),
            Self::Date(value) => format_date(*value),
            Self::List(items) => items
                .iter()
                .map(Self::display)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Numeric coercion with the loose rules UIs expect: null and blank text
    /// are zero, booleans are 0/1, dates are epoch millis, and anything
    /// unparseable is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Number(value) => *value,
            Self::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Date(value) => epoch_millis(*value),
            Self::List(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
        }
    }

    pub fn to_date(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Date(value) => Some(*value),
            Self::Number(millis) if millis.is_finite() => {
                let nanos = (*millis as i128).checked_mul(1_000_000)?;
                OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
            }
            Self::Text(value) => parse_date_text(value.trim()),
            _ => None,
        }
    }

    pub fn date_millis(&self) -> Option<f64> {
        self.to_date().map(epoch_millis)
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(value) if value.eq_ignore_ascii_case("true") => Some(true),
            Self::Text(value) if value.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::Text(value) => !value.is_empty(),
            Self::Date(_) | Self::List(_) => true,
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(value) => Self::Bool(*value),
            JsonValue::Number(value) => value.as_f64().map_or(Self::Null, Self::Number),
            JsonValue::String(value) => Self::Text(value.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(_) => Self::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(value) => JsonValue::Bool(*value),
            Self::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
                    JsonValue::from(*value as i64)
                } else {
                    serde_json::Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number)
                }
            }
            Self::Text(value) => JsonValue::String(value.clone()),
            Self::Date(value) => JsonValue::String(format_date(*value)),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(|value| Self::from_json(&value))
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<OffsetDateTime> for CellValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<Date> for CellValue {
    fn from(value: Date) -> Self {
        Self::Date(value.with_time(Time::MIDNIGHT).assume_utc())
    }
}

impl From<Vec<CellValue>> for CellValue {
    fn from(value: Vec<CellValue>) -> Self {
        Self::List(value)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Read/write access to a row by key path. `serde_json::Value` rows resolve
/// dotted paths (`address.city`, `tags.0`).
pub trait Record {
    fn field(&self, key: &str) -> CellValue;

    fn set_field(&mut self, _key: &str, _value: CellValue) -> bool {
        false
    }
}

impl Record for JsonValue {
    fn field(&self, key: &str) -> CellValue {
        let mut current = self;
        for segment in key.split('.') {
            let next = match current {
                JsonValue::Object(map) => map.get(segment),
                JsonValue::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            };
            let Some(next) = next else {
                return CellValue::Null;
            };
            current = next;
        }
        CellValue::from_json(current)
    }

    fn set_field(&mut self, key: &str, value: CellValue) -> bool {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return false;
        };

        let mut current = self;
        for segment in segments {
            current = match current {
                JsonValue::Object(map) => match map.get_mut(segment) {
                    Some(next) => next,
                    None => return false,
                },
                _ => return false,
            };
        }

        match current {
            JsonValue::Object(map) => {
                map.insert(last.to_owned(), value.to_json());
                true
            }
            _ => false,
        }
    }
}

impl Record for BTreeMap<String, CellValue> {
    fn field(&self, key: &str) -> CellValue {
        self.get(key).cloned().unwrap_or_default()
    }

    fn set_field(&mut self, key: &str, value: CellValue) -> bool {
        self.insert(key.to_owned(), value);
        true
    }
}

/// Case-insensitive comparison that orders embedded digit runs by numeric
/// value, so `"Row 9"` sorts before `"Row 10"`.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let mut left = left.chars().peekable();
    let mut right = right.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let left_run = take_digits(&mut left);
                let right_run = take_digits(&mut right);
                let order = cmp_digit_runs(&left_run, &right_run);
                if order != Ordering::Equal {
                    return order;
                }
            }
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                let order = fold_case(l).cmp(&fold_case(r));
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied()
        && c.is_ascii_digit()
    {
        run.push(c);
        chars.next();
    }
    run
}

fn cmp_digit_runs(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        let label = if value > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_owned()
    } else {
        value.to_string()
    }
}

fn format_date(value: OffsetDateTime) -> String {
    if value.offset() == UtcOffset::UTC && value.time() == Time::MIDNIGHT {
        return value.date().to_string();
    }
    value.format(&Rfc3339).unwrap_or_else(|_| value.date().to_string())
}

fn epoch_millis(value: OffsetDateTime) -> f64 {
    (value.unix_timestamp_nanos() / 1_000_000) as f64
}

fn parse_date_text(raw: &str) -> Option<OffsetDateTime> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    let day = raw.get(..10).unwrap_or(raw);
    Date::parse(day, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::{CellValue, Record, natural_cmp};
    use serde_json::json;
    use std::cmp::Ordering;
    use time::macros::datetime;

    #[test]
    fn natural_cmp_orders_digit_runs_numerically() {
        assert_eq!(natural_cmp("Row 9", "Row 10"), Ordering::Less);
        assert_eq!(natural_cmp("row 10", "Row 10"), Ordering::Equal);
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("item 007", "item 7"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
    }

    #[test]
    fn to_number_follows_loose_coercion() {
        assert_eq!(CellValue::from("42").to_number(), 42.0);
        assert_eq!(CellValue::from(" ").to_number(), 0.0);
        assert_eq!(CellValue::from(true).to_number(), 1.0);
        assert!(CellValue::from("abc").to_number().is_nan());
        assert_eq!(CellValue::Null.to_number(), 0.0);
    }

    #[test]
    fn to_date_accepts_rfc3339_and_plain_days() {
        let plain = CellValue::from("2024-03-05").to_date();
        assert_eq!(plain, Some(datetime!(2024-03-05 0:00 UTC)));

        let full = CellValue::from("2024-03-05T10:30:00Z").to_date();
        assert_eq!(full, Some(datetime!(2024-03-05 10:30 UTC)));

        assert_eq!(CellValue::from("soon").to_date(), None);
    }

    #[test]
    fn to_date_rejects_out_of_range_numbers() {
        assert_eq!(CellValue::from(1e300).to_date(), None);
        assert_eq!(CellValue::from(-1e40).to_date(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).to_date(), None);
        assert_eq!(
            CellValue::from(0).to_date(),
            Some(datetime!(1970-01-01 0:00 UTC))
        );
    }

    #[test]
    fn display_renders_integral_numbers_without_fraction() {
        assert_eq!(CellValue::from(30).display(), "30");
        assert_eq!(CellValue::from(2.5).display(), "2.5");
        assert_eq!(CellValue::Null.display(), "");
        assert_eq!(
            CellValue::from(datetime!(2024-01-02 0:00 UTC)).display(),
            "2024-01-02"
        );
    }

    #[test]
    fn json_rows_resolve_dotted_paths() {
        let row = json!({"name": "Ada", "address": {"city": "Boise"}, "tags": ["a", "b"]});
        assert_eq!(row.field("address.city"), CellValue::from("Boise"));
        assert_eq!(row.field("tags.1"), CellValue::from("b"));
        assert_eq!(row.field("missing.path"), CellValue::Null);
    }

    #[test]
    fn json_rows_write_through_existing_objects() {
        let mut row = json!({"name": "Ada", "address": {"city": "Boise"}});
        assert!(row.set_field("address.city", CellValue::from("Omaha")));
        assert_eq!(row["address"]["city"], "Omaha");
        assert!(!row.set_field("nope.city", CellValue::from("x")));
    }

    #[test]
    fn is_empty_covers_null_blank_and_empty_lists() {
        assert!(CellValue::Null.is_empty());
        assert!(CellValue::from("").is_empty());
        assert!(CellValue::List(Vec::new()).is_empty());
        assert!(!CellValue::from(0).is_empty());
    }
}
