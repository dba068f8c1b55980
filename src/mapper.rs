//! Field-name mapping from flat paths to display names.
//!
//! Applies a schema's ordered rename rules to a list of flat field
//! names. The result preserves the input order of the field names, not
//! the rule order. Rules iterate in derivation order as the outer
//! loop, fields as the inner loop, mutating as they go: a field
//! rewritten by an earlier rule can be rewritten again when its
//! current value still matches a later pattern.

use crate::schema::RenameRule;

/// Ordered mapping from original flat field name to display name,
/// covering every field passed to [`map_field_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameMap {
    entries: Vec<(String, String)>,
}

impl FieldNameMap {
    /// The display name mapped to `field`, if `field` was in the input.
    pub fn display(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(original, _)| original == field)
            .map(|(_, display)| display.as_str())
    }

    /// Display names in input field order.
    pub fn display_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(_, display)| display.as_str())
            .collect()
    }

    /// Iterate `(original, display)` pairs in input field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(original, display)| (original.as_str(), display.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map flat field names onto display names using `rules`.
///
/// Every field starts mapped to itself; a rule rewrites any field
/// whose current mapped value fully matches its pattern.
pub fn map_field_names(fieldnames: &[String], rules: &[RenameRule]) -> FieldNameMap {
    let mut entries: Vec<(String, String)> = fieldnames
        .iter()
        .map(|field| (field.clone(), field.clone()))
        .collect();

    for rule in rules {
        for (_, current) in entries.iter_mut() {
            if rule.matches(current) {
                *current = rule.apply(current);
            }
        }
    }

    FieldNameMap { entries }
}
