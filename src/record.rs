//! Turns raw API items into labelled records.

use crate::api_client::RawItem;
use crate::query::EntityKind;
use serde_json::{Map, Value};

/// One item with its identity fields pulled out into `label`.
///
/// Labels are display keys, not primary keys: two records may share one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub label: String,
    pub fields: Map<String, Value>,
}

impl NormalizedRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Extract the identity of `item` for `kind` and remove those fields.
///
/// Organizations are labelled by `name`; people by `first_name` followed
/// directly by `last_name`. Missing or null parts count as empty.
pub fn normalize(kind: EntityKind, item: RawItem) -> NormalizedRecord {
    let mut fields = item.properties;
    let mut label = String::new();

    for field in kind.identity_fields() {
        match fields.remove(*field) {
            Some(Value::String(s)) => label.push_str(&s),
            Some(Value::Null) | None => {}
            Some(other) => label.push_str(&other.to_string()),
        }
    }

    NormalizedRecord { label, fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> RawItem {
        RawItem {
            properties: value.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_organization_identity() {
        let record = normalize(
            EntityKind::Organization,
            item(json!({"name": "Acme", "domain": "acme.com", "num_employees_min": 10})),
        );

        assert_eq!(record.label, "Acme");
        assert!(record.get("name").is_none());
        assert_eq!(record.get("domain"), Some(&json!("acme.com")));
        assert_eq!(record.fields.len(), 2);
    }

    #[test]
    fn test_person_identity_concatenates_names() {
        let record = normalize(
            EntityKind::Person,
            item(json!({"first_name": "Ritwik", "last_name": "Bhattacharya", "title": "CTO"})),
        );

        assert_eq!(record.label, "RitwikBhattacharya");
        assert!(record.get("first_name").is_none());
        assert!(record.get("last_name").is_none());
        assert_eq!(record.get("title"), Some(&json!("CTO")));
    }

    #[test]
    fn test_missing_identity_fields() {
        let record = normalize(
            EntityKind::Person,
            item(json!({"first_name": null, "title": "Partner"})),
        );
        assert_eq!(record.label, "");
        assert_eq!(record.fields.len(), 1);

        let numeric = normalize(EntityKind::Organization, item(json!({"name": 42})));
        assert_eq!(numeric.label, "42");
    }
}
