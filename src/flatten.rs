//! Nested-to-flat record transformation.
//!
//! One grant is an arbitrarily nested JSON object. For tabular export
//! it becomes a single-level ordered mapping keyed by dotted/indexed
//! paths: `grant["recipientOrganization"][0]["name"]` flattens to
//! `recipientOrganization.0.name`. Traversal is depth-first,
//! left-to-right, and the output preserves first-seen key order
//! (`serde_json` is built with `preserve_order`, so `Map` keeps
//! insertion order).

use serde_json::{Map, Value};

/// Ordered mapping from flat field path to scalar value, one per record.
pub type FlatRow = Map<String, Value>;

/// Flatten the fields of one record into a [`FlatRow`].
///
/// Sequences are treated as mappings from stringified index to
/// element; scalars pass through unchanged with no type coercion.
pub fn flatten(fields: &Map<String, Value>) -> FlatRow {
    let mut row = FlatRow::new();
    for (key, value) in fields {
        flatten_into(&mut row, key.clone(), value);
    }
    row
}

fn flatten_into(row: &mut FlatRow, key: String, value: &Value) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(row, format!("{key}.{index}"), item);
            }
        }
        Value::Object(nested) => {
            for (nested_key, nested_value) in nested {
                flatten_into(row, format!("{key}.{nested_key}"), nested_value);
            }
        }
        scalar => {
            // Traversal paths are unique per record, so no key can repeat.
            row.insert(key, scalar.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_scalar_record_unchanged() {
        let record = fields(json!({ "id": "360G-1", "title": "Roof repair", "amountAwarded": 1500 }));
        let row = flatten(&record);

        assert_eq!(row.len(), 3);
        assert_eq!(row["id"], "360G-1");
        assert_eq!(row["title"], "Roof repair");
        assert_eq!(row["amountAwarded"], 1500);
    }

    #[test]
    fn test_key_order_is_first_seen() {
        let record = fields(json!({ "a": 1, "b": [10, 20], "c": 2 }));
        let row = flatten(&record);

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b.0", "b.1", "c"]);
    }

    #[test]
    fn test_nested_object_dotted() {
        let record = fields(json!({ "grantProgramme": { "code": "AB", "title": "Main Fund" } }));
        let row = flatten(&record);

        assert_eq!(row["grantProgramme.code"], "AB");
        assert_eq!(row["grantProgramme.title"], "Main Fund");
    }

    #[test]
    fn test_array_of_objects_indexed() {
        let record = fields(json!({
            "recipientOrganization": [
                { "id": "GB-CHC-1", "name": "Example Trust" },
                { "id": "GB-CHC-2", "name": "Other Trust" }
            ]
        }));
        let row = flatten(&record);

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "recipientOrganization.0.id",
                "recipientOrganization.0.name",
                "recipientOrganization.1.id",
                "recipientOrganization.1.name",
            ]
        );
        assert_eq!(row["recipientOrganization.1.name"], "Other Trust");
    }

    #[test]
    fn test_values_pass_through_untouched() {
        let record = fields(json!({
            "amountAwarded": 1500.5,
            "fromOpenCall": true,
            "description": null
        }));
        let row = flatten(&record);

        assert_eq!(row["amountAwarded"], json!(1500.5));
        assert_eq!(row["fromOpenCall"], json!(true));
        assert_eq!(row["description"], Value::Null);
    }

    #[test]
    fn test_empty_containers_produce_nothing() {
        let record = fields(json!({ "relatedActivity": [], "grantProgramme": {} }));
        let row = flatten(&record);
        assert!(row.is_empty());
    }

    #[test]
    fn test_deep_mixed_nesting() {
        let record = fields(json!({
            "beneficiaryLocation": [
                { "geo": { "codes": ["E09", "E10"] } }
            ]
        }));
        let row = flatten(&record);

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "beneficiaryLocation.0.geo.codes.0",
                "beneficiaryLocation.0.geo.codes.1",
            ]
        );
        assert_eq!(row["beneficiaryLocation.0.geo.codes.1"], "E10");
    }
}
