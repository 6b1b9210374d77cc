//! Asset metadata: fixed ("wired") fields and named multi-valued dynamic fields.
//!
//! Both kinds are reachable through [`Metadata::values_of`], so a caller
//! matching on a field name never needs to know which kind it is.

use chrono::{DateTime, NaiveDate, Utc};
use cws_connectors::reply::list_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accessor for one wired field.
pub type WiredAccessor = fn(&Metadata) -> Option<&str>;

/// Wired field names and their accessors, in wire order.
pub const WIRED_FIELDS: &[(&str, WiredAccessor)] = &[
    ("author", Metadata::author),
    ("displayName", Metadata::display_name),
    ("endDate", Metadata::end_date_text),
    ("keywords", Metadata::keywords),
    ("metaDescription", Metadata::meta_description),
    ("reviewDate", Metadata::review_date_text),
    ("startDate", Metadata::start_date_text),
    ("summary", Metadata::summary),
    ("teaser", Metadata::teaser),
    ("title", Metadata::title),
];

/// A named dynamic field and its values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicField {
    pub name: String,
    pub values: Vec<String>,
}

/// Parsed metadata of one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    wired: serde_json::Map<String, Value>,
    dynamic: Vec<DynamicField>,
}

/// Parses a wire timestamp: RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // The service sometimes omits the offset colon.
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl Metadata {
    /// Reads a `metadata` object off the wire. Anything that is not an object is empty.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let wired = map
            .iter()
            .filter(|(k, _)| Self::is_wired_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let dynamic = list_of(map.get("dynamicFields"), "dynamicField")
            .into_iter()
            .filter_map(|field| {
                let name = field.get("name")?.as_str()?.to_string();
                let values = list_of(field.get("fieldValues"), "fieldValue")
                    .into_iter()
                    .filter_map(|v| v.get("value").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                Some(DynamicField { name, values })
            })
            .collect();

        Self { wired, dynamic }
    }

    /// True when `name` is one of the fixed metadata fields.
    pub fn is_wired_field(name: &str) -> bool {
        WIRED_FIELDS.iter().any(|(field, _)| *field == name)
    }

    /// The accessor for wired field `name`.
    pub fn wired_accessor(name: &str) -> Option<WiredAccessor> {
        WIRED_FIELDS
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, accessor)| *accessor)
    }

    fn wired(&self, name: &str) -> Option<&str> {
        self.wired
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.wired("author")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.wired("displayName")
    }

    pub fn keywords(&self) -> Option<&str> {
        self.wired("keywords")
    }

    pub fn meta_description(&self) -> Option<&str> {
        self.wired("metaDescription")
    }

    pub fn summary(&self) -> Option<&str> {
        self.wired("summary")
    }

    pub fn teaser(&self) -> Option<&str> {
        self.wired("teaser")
    }

    pub fn title(&self) -> Option<&str> {
        self.wired("title")
    }

    fn end_date_text(&self) -> Option<&str> {
        self.wired("endDate")
    }

    fn review_date_text(&self) -> Option<&str> {
        self.wired("reviewDate")
    }

    fn start_date_text(&self) -> Option<&str> {
        self.wired("startDate")
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date_text().and_then(parse_timestamp)
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date_text().and_then(parse_timestamp)
    }

    pub fn review_date(&self) -> Option<DateTime<Utc>> {
        self.review_date_text().and_then(parse_timestamp)
    }

    /// Dynamic fields in wire order.
    pub fn dynamic_fields(&self) -> &[DynamicField] {
        &self.dynamic
    }

    pub fn dynamic_field(&self, name: &str) -> Option<&DynamicField> {
        self.dynamic.iter().find(|f| f.name == name)
    }

    /// Every value field `name` holds, wired or dynamic. Unknown names have none.
    pub fn values_of(&self, name: &str) -> Vec<&str> {
        if let Some(accessor) = Self::wired_accessor(name) {
            return accessor(self).into_iter().collect();
        }
        self.dynamic_field(name)
            .map(|f| f.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_wired_fields() {
        let md = Metadata::from_value(&json!({
            "title": "Home",
            "author": "",
            "endDate": "2020-01-01T00:00:00Z"
        }));
        assert_eq!(md.title(), Some("Home"));
        assert_eq!(md.author(), None);
        assert_eq!(
            md.end_date(),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(md.values_of("title"), vec!["Home"]);
        assert!(md.values_of("author").is_empty());
    }

    #[test]
    fn test_wired_lookup_table() {
        assert!(Metadata::is_wired_field("displayName"));
        assert!(!Metadata::is_wired_field("audience"));
        assert_eq!(WIRED_FIELDS.len(), 10);
    }

    #[test]
    fn test_dynamic_fields_array_shape() {
        let md = Metadata::from_value(&json!({
            "dynamicFields": [
                {"name": "audience", "fieldValues": [{"value": "students"}, {"value": "staff"}]},
                {"name": "empty", "fieldValues": []}
            ]
        }));
        assert_eq!(md.values_of("audience"), vec!["students", "staff"]);
        assert!(md.values_of("empty").is_empty());
        assert!(md.values_of("missing").is_empty());
    }

    #[test]
    fn test_dynamic_fields_wrapped_shape() {
        let md = Metadata::from_value(&json!({
            "dynamicFields": {"dynamicField": {
                "name": "audience",
                "fieldValues": {"fieldValue": {"value": "alumni"}}
            }}
        }));
        assert_eq!(md.dynamic_fields().len(), 1);
        assert_eq!(md.values_of("audience"), vec!["alumni"]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2021-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("2021-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(
            parse_timestamp("2020-12-31T19:00:00.000-0500"),
            Some(midnight)
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_non_object_is_empty() {
        assert_eq!(Metadata::from_value(&Value::Null), Metadata::default());
    }
}
