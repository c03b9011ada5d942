//! Field resolution for documents whose schema drifted over time.
//!
//! The same fact (a subject code, a score) may live under several keys and
//! may be stored as a number, a numeric string or an object id wrapper.
//! Readers here never fail: anything they cannot interpret is absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Returns the first candidate that is present and not blank, trimmed.
pub fn first_non_blank<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Returns the first candidate that yields a value.
pub fn first_value<T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    candidates.into_iter().flatten().next()
}

pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses `"85"`, `"85.5 %"` or `"85%"`.
pub fn parse_percent_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_number(number)
}

pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    let text = value
        .as_str()
        .or_else(|| value.get("$date").and_then(Value::as_str))?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text.trim()) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub mod lenient {
    use super::*;

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(number_from_value))
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(text_from_value))
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(timestamp_from_value))
    }

    /// A nested object; `null`, scalars, arrays or a body that fails to read give `None`.
    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .filter(Value::is_object)
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Like [`object`], falling back to `T::default()`.
    pub fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(object(deserializer)?.unwrap_or_default())
    }

    /// An array of objects; anything but an array is empty and unreadable entries are dropped.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let items = match value {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        };
        Ok(items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_non_blank_skips_missing_and_blank() {
        let resolved = first_non_blank([None, Some("   "), Some(" CS101 "), Some("MATH")]);
        assert_eq!(resolved, Some("CS101"));
        assert_eq!(first_non_blank([None, Some("")]), None);
    }

    #[test]
    fn first_value_keeps_priority_order() {
        assert_eq!(first_value([None, Some(2.0), Some(3.0)]), Some(2.0));
        assert_eq!(first_value::<f64, _>([None, None]), None);
    }

    #[test]
    fn numbers_accept_numeric_strings_only() {
        assert_eq!(number_from_value(&json!(8)), Some(8.0));
        assert_eq!(number_from_value(&json!(" 9.5 ")), Some(9.5));
        assert_eq!(number_from_value(&json!("A-")), None);
        assert_eq!(number_from_value(&json!(true)), None);
    }

    #[test]
    fn percent_text_strips_trailing_sign() {
        assert_eq!(parse_percent_text("85%"), Some(85.0));
        assert_eq!(parse_percent_text(" 72.5 % "), Some(72.5));
        assert_eq!(parse_percent_text("B+"), None);
    }

    #[test]
    fn object_ids_read_as_text() {
        assert_eq!(
            text_from_value(&json!({"$oid": "65a1f0"})),
            Some("65a1f0".to_string())
        );
        assert_eq!(text_from_value(&json!(101)), Some("101".to_string()));
        assert_eq!(text_from_value(&json!(null)), None);
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    struct Inner {
        #[serde(deserialize_with = "lenient::number")]
        points: Option<f64>,
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    struct Outer {
        #[serde(deserialize_with = "lenient::object")]
        detail: Option<Inner>,
        #[serde(deserialize_with = "lenient::object_or_default")]
        core: Inner,
        #[serde(deserialize_with = "lenient::list")]
        items: Vec<Inner>,
    }

    #[test]
    fn nested_objects_degrade_to_defaults() {
        let outer: Outer = serde_json::from_value(json!({
            "detail": "n/a",
            "core": null,
            "items": null
        }))
        .unwrap();
        assert!(outer.detail.is_none());
        assert!(outer.core.points.is_none());
        assert!(outer.items.is_empty());

        let outer: Outer = serde_json::from_value(json!({
            "detail": {"points": "4"},
            "core": [1, 2],
            "items": [{"points": 1}, "junk", 7, {"points": "x"}]
        }))
        .unwrap();
        assert_eq!(outer.detail.and_then(|d| d.points), Some(4.0));
        assert!(outer.core.points.is_none());
        assert_eq!(outer.items.len(), 2);
        assert_eq!(outer.items[0].points, Some(1.0));
        assert_eq!(outer.items[1].points, None);
    }

    #[test]
    fn timestamps_accept_rfc3339_and_plain_dates() {
        assert!(timestamp_from_value(&json!("2026-02-01T10:00:00Z")).is_some());
        assert!(timestamp_from_value(&json!({"$date": "2026-02-01T10:00:00Z"})).is_some());
        assert!(timestamp_from_value(&json!("2026-02-01")).is_some());
        assert!(timestamp_from_value(&json!("yesterday")).is_none());
    }
}
