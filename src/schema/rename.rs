//! Derivation of field rename rules from a dereferenced schema.
//!
//! Flattened field paths like `recipientOrganization.0.name` are not
//! what a spreadsheet user wants to read. The schema carries a `title`
//! for most properties, so one depth-first traversal of
//! `properties.<root_id>.items.properties` yields an ordered list of
//! regex rules mapping generated paths to titled paths
//! (`Recipient Org:0:Name`). Array properties recurse into
//! `items.properties` with a numeric capture group spliced into the
//! pattern; everything else terminates a rule.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};

/// One ordered pattern -> replacement pair for flat field paths.
///
/// `pattern` matches a whole flat field path, capturing array indices;
/// `replacement` is the titled path template with `${1}`
/// back-references. Rule order is the schema's own property order.
#[derive(Debug, Clone)]
pub struct RenameRule {
    /// Unanchored source pattern, e.g. `recipientOrganization.([0-9]+).name`.
    pub pattern: String,
    /// Replacement template, e.g. `Recipient Org:${1}:Name`.
    pub replacement: String,
    regex: Regex,
}

impl RenameRule {
    /// Build a rule from a raw pattern and replacement template.
    pub fn new(pattern: String, replacement: String) -> SchemaResult<Self> {
        // Full-string match, not substring.
        let regex = Regex::new(&format!(r"\A(?:{pattern})\z")).map_err(|source| {
            SchemaError::Pattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        Ok(Self {
            pattern,
            replacement,
            regex,
        })
    }

    /// Whether `field` matches this rule's pattern in full.
    pub fn matches(&self, field: &str) -> bool {
        self.regex.is_match(field)
    }

    /// Substitute the replacement template against `field`, honouring
    /// back-references. Only meaningful when [`Self::matches`] holds.
    pub fn apply(&self, field: &str) -> String {
        self.regex
            .replace(field, self.replacement.as_str())
            .into_owned()
    }
}

/// Derive the ordered rename rules for the per-record properties of a
/// dereferenced package schema.
///
/// `properties` is `schema.properties.<root_id>.items.properties`.
/// Traversal is depth-first in declared property order, and the rule
/// list preserves that order.
pub fn derive_rename_rules(properties: &Map<String, Value>) -> SchemaResult<Vec<RenameRule>> {
    let mut rules = Vec::new();
    recurse_names(properties, "", "", &mut rules)?;
    Ok(rules)
}

fn recurse_names(
    properties: &Map<String, Value>,
    prefix_pattern: &str,
    prefix_replacement: &str,
    rules: &mut Vec<RenameRule>,
) -> SchemaResult<()> {
    for (name, property) in properties {
        let title = property
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(name);

        let pattern = if prefix_pattern.is_empty() {
            name.clone()
        } else {
            format!("{prefix_pattern}.([0-9]+).{name}")
        };
        // The index back-reference is group 1 at every depth.
        let replacement = if prefix_replacement.is_empty() {
            escape_template(title)
        } else {
            format!("{prefix_replacement}:${{1}}:{}", escape_template(title))
        };

        if property.get("type").and_then(Value::as_str) == Some("array") {
            if let Some(child) = property
                .get("items")
                .and_then(|items| items.get("properties"))
                .and_then(Value::as_object)
            {
                recurse_names(child, &pattern, &replacement, rules)?;
            }
        } else {
            rules.push(RenameRule::new(pattern, replacement)?);
        }
    }
    Ok(())
}

/// Escape literal `$` so titles survive regex substitution untouched.
fn escape_template(title: &str) -> String {
    title.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_minimal_schema_rules() {
        let props = properties(json!({
            "id": { "title": "Identifier" },
            "recipientOrganization": {
                "type": "array",
                "items": { "properties": { "name": { "title": "Org Name" } } }
            }
        }));
        let rules = derive_rename_rules(&props).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].pattern, "id");
        assert_eq!(rules[0].replacement, "Identifier");
        assert_eq!(rules[1].pattern, "recipientOrganization.([0-9]+).name");
        assert_eq!(rules[1].replacement, "recipientOrganization:${1}:Org Name");
    }

    #[test]
    fn test_title_falls_back_to_property_name() {
        let props = properties(json!({ "dataSource": { "type": "string" } }));
        let rules = derive_rename_rules(&props).unwrap();
        assert_eq!(rules[0].pattern, "dataSource");
        assert_eq!(rules[0].replacement, "dataSource");
    }

    #[test]
    fn test_rule_order_follows_property_order() {
        let props = properties(json!({
            "title": { "title": "Title" },
            "amountAwarded": { "title": "Amount Awarded" },
            "awardDate": { "title": "Award Date" }
        }));
        let rules = derive_rename_rules(&props).unwrap();
        let patterns: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["title", "amountAwarded", "awardDate"]);
    }

    #[test]
    fn test_array_without_item_properties_yields_no_rules() {
        let props = properties(json!({
            "classifications": { "type": "array", "items": { "type": "string" } }
        }));
        let rules = derive_rename_rules(&props).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_nested_array_pattern_and_template() {
        let props = properties(json!({
            "fundingOrganization": {
                "title": "Funding Org",
                "type": "array",
                "items": { "properties": {
                    "department": {
                        "title": "Department",
                        "type": "array",
                        "items": { "properties": { "name": { "title": "Name" } } }
                    }
                } }
            }
        }));
        let rules = derive_rename_rules(&props).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].pattern,
            "fundingOrganization.([0-9]+).department.([0-9]+).name"
        );
        assert_eq!(
            rules[0].replacement,
            "Funding Org:${1}:Department:${1}:Name"
        );
    }

    #[test]
    fn test_full_match_only() {
        let rule = RenameRule::new(
            "recipientOrganization.([0-9]+).name".into(),
            "Recipient Org:${1}:Name".into(),
        )
        .unwrap();
        assert!(rule.matches("recipientOrganization.0.name"));
        assert!(!rule.matches("recipientOrganization.0.name.suffix"));
        assert!(!rule.matches("xrecipientOrganization.0.name"));
    }

    #[test]
    fn test_apply_substitutes_index() {
        let rule = RenameRule::new(
            "recipientOrganization.([0-9]+).name".into(),
            "Recipient Org:${1}:Name".into(),
        )
        .unwrap();
        assert_eq!(
            rule.apply("recipientOrganization.12.name"),
            "Recipient Org:12:Name"
        );
    }

    #[test]
    fn test_dollar_in_title_is_literal() {
        let props = properties(json!({
            "amountAwarded": { "title": "Amount ($)" }
        }));
        let rules = derive_rename_rules(&props).unwrap();
        assert_eq!(rules[0].apply("amountAwarded"), "Amount ($)");
    }
}
