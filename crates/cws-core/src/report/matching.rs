//! Field/value matching over metadata.

use crate::metadata::Metadata;
use cws_connectors::{CascadeError, CascadeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How several field/value pairs combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Any one pair satisfied.
    Disjunctive,
    /// Every pair satisfied.
    Conjunctive,
}

impl MatchPolicy {
    pub fn from_flag(disjunctive: bool) -> Self {
        if disjunctive {
            MatchPolicy::Disjunctive
        } else {
            MatchPolicy::Conjunctive
        }
    }
}

/// One expected `field == value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPair {
    pub name: String,
    pub value: String,
}

impl FieldPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Reads `[{ "field": "value" }, ...]`; an object may hold several pairs.
    pub fn list_from_value(value: &Value) -> CascadeResult<Vec<FieldPair>> {
        let items = value.as_array().ok_or_else(|| {
            CascadeError::UnacceptableValue(format!("Field pairs must be a list, got {}", value))
        })?;

        let mut pairs = Vec::new();
        for item in items {
            let map = item.as_object().ok_or_else(|| {
                CascadeError::UnacceptableValue(format!("Field pair must be an object, got {}", item))
            })?;
            for (name, expected) in map {
                let expected = expected.as_str().ok_or_else(|| {
                    CascadeError::UnacceptableValue(format!(
                        "Value for field '{}' must be a string",
                        name
                    ))
                })?;
                pairs.push(FieldPair::new(name, expected));
            }
        }
        Ok(pairs)
    }

    pub fn to_value(pairs: &[FieldPair]) -> Value {
        Value::Array(
            pairs
                .iter()
                .map(|p| serde_json::json!({ p.name.as_str(): p.value }))
                .collect(),
        )
    }

    /// Whether any value of the named field, wired or dynamic, equals the expected one.
    pub fn is_satisfied_by(&self, metadata: &Metadata) -> bool {
        metadata
            .values_of(&self.name)
            .iter()
            .any(|v| *v == self.value)
    }
}

/// Combines `pairs` under `policy`, stopping at the first deciding pair.
///
/// An empty list never matches.
pub fn matches(metadata: &Metadata, pairs: &[FieldPair], policy: MatchPolicy) -> bool {
    if pairs.is_empty() {
        return false;
    }
    match policy {
        MatchPolicy::Disjunctive => pairs.iter().any(|p| p.is_satisfied_by(metadata)),
        MatchPolicy::Conjunctive => pairs.iter().all(|p| p.is_satisfied_by(metadata)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> Metadata {
        Metadata::from_value(&json!({
            "title": "x",
            "dynamicFields": [
                {"name": "B", "fieldValues": [{"value": "z"}]},
                {"name": "audience", "fieldValues": [{"value": "staff"}, {"value": "students"}]}
            ]
        }))
    }

    #[test]
    fn test_disjunctive_vs_conjunctive() {
        let pairs = vec![FieldPair::new("title", "x"), FieldPair::new("B", "y")];
        assert!(matches(&metadata(), &pairs, MatchPolicy::from_flag(true)));
        assert!(!matches(&metadata(), &pairs, MatchPolicy::from_flag(false)));
    }

    #[test]
    fn test_multi_valued_dynamic_field() {
        let pairs = vec![
            FieldPair::new("audience", "students"),
            FieldPair::new("title", "x"),
        ];
        assert!(matches(&metadata(), &pairs, MatchPolicy::Conjunctive));
    }

    #[test]
    fn test_empty_pairs_never_match() {
        assert!(!matches(&metadata(), &[], MatchPolicy::Conjunctive));
        assert!(!matches(&metadata(), &[], MatchPolicy::Disjunctive));
    }

    #[test]
    fn test_pairs_from_value() {
        let pairs = FieldPair::list_from_value(&json!([{"A": "x"}, {"B": "y"}])).unwrap();
        assert_eq!(pairs, vec![FieldPair::new("A", "x"), FieldPair::new("B", "y")]);
        assert_eq!(FieldPair::list_from_value(&FieldPair::to_value(&pairs)).unwrap(), pairs);

        assert!(matches!(
            FieldPair::list_from_value(&json!({"A": "x"})),
            Err(CascadeError::UnacceptableValue(_))
        ));
        assert!(matches!(
            FieldPair::list_from_value(&json!([{"A": 1}])),
            Err(CascadeError::UnacceptableValue(_))
        ));
    }
}
