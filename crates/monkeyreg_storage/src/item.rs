//! Canonical mapping form shared by every backend.
//!
//! Backends never see a validated record type. They store and return
//! [`Item`]s, a JSON object with the keys listed in [`CANONICAL_FIELDS`].

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// The backend-agnostic key/value representation of a record.
pub type Item = Map<String, Value>;

/// Key holding the record id.
pub const FIELD_ID: &str = "id";
/// Key holding the record name.
pub const FIELD_NAME: &str = "name";
/// Key holding the lowercase canonical category.
pub const FIELD_CATEGORY: &str = "category";
/// Key holding the age in years.
pub const FIELD_AGE: &str = "age";
/// Key holding the free-text note.
pub const FIELD_NOTE: &str = "note";
/// Key holding the optional last check timestamp.
pub const FIELD_LAST_CHECK_TIME: &str = "last_check_time";
/// Key holding the creation timestamp.
pub const FIELD_CREATED_AT: &str = "created_at";
/// Key holding the last modification timestamp.
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// Every key of the canonical form, in serialization order.
pub const CANONICAL_FIELDS: [&str; 8] = [
    FIELD_ID,
    FIELD_NAME,
    FIELD_CATEGORY,
    FIELD_AGE,
    FIELD_NOTE,
    FIELD_LAST_CHECK_TIME,
    FIELD_CREATED_AT,
    FIELD_UPDATED_AT,
];

/// Returns the current UTC time as RFC 3339 with seconds precision.
///
/// Every `created_at`/`updated_at` value is produced here, so stored
/// timestamps of one format compare correctly as strings.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Returns the `updated_at` value for a modification made now.
///
/// Never earlier than `created_at`, so a record created with a clock ahead
/// of this one still satisfies `created_at <= updated_at`.
#[must_use]
pub fn refreshed_updated_at(created_at: Option<&str>) -> String {
    let now = timestamp_now();
    match created_at {
        Some(created_at) if now.as_str() < created_at => created_at.to_string(),
        _ => now,
    }
}

/// Trims and lowercases a value for case-insensitive comparison.
#[must_use]
pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns the id of an item, if present and a string.
#[must_use]
pub fn item_id(item: &Item) -> Option<&str> {
    item.get(FIELD_ID).and_then(Value::as_str)
}

/// Returns a string field folded for comparison, or an empty string.
#[must_use]
pub fn folded_field(item: &Item, key: &str) -> String {
    item.get(key).and_then(Value::as_str).map(fold).unwrap_or_default()
}

/// Copies every non-null field of `fields` onto `target`.
pub fn merge_non_null(target: &mut Item, fields: Item) {
    for (key, value) in fields {
        if !value.is_null() {
            target.insert(key, value);
        }
    }
}

/// Folds a search query; `None` when the query is blank.
#[must_use]
pub fn search_needle(query: &str) -> Option<String> {
    let needle = fold(query);
    (!needle.is_empty()).then_some(needle)
}

/// True when `needle` is a substring of the item's name or category.
#[must_use]
pub fn matches_search(item: &Item, needle: &str) -> bool {
    folded_field(item, FIELD_NAME).contains(needle)
        || folded_field(item, FIELD_CATEGORY).contains(needle)
}

/// True when the item's name and category equal the given pair, ignoring
/// case and surrounding whitespace.
#[must_use]
pub fn matches_natural_key(item: &Item, name: &str, category: &str) -> bool {
    folded_field(item, FIELD_NAME) == fold(name)
        && folded_field(item, FIELD_CATEGORY) == fold(category)
}

/// Optional filters accepted by `list`.
///
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Case-insensitive exact category.
    pub category: Option<String>,
}

impl ListFilter {
    /// Creates an empty filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name substring filter.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the exact category filter.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The folded name filter, if one is set and non-blank.
    #[must_use]
    pub fn name_needle(&self) -> Option<String> {
        self.name.as_deref().map(fold).filter(|n| !n.is_empty())
    }

    /// The folded category filter, if one is set and non-blank.
    #[must_use]
    pub fn category_needle(&self) -> Option<String> {
        self.category.as_deref().map(fold).filter(|c| !c.is_empty())
    }

    /// Returns true if the filter matches every item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_needle().is_none() && self.category_needle().is_none()
    }

    /// Evaluates the filter against an item.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(name) = self.name_needle() {
            if !folded_field(item, FIELD_NAME).contains(&name) {
                return false;
            }
        }
        if let Some(category) = self.category_needle() {
            if folded_field(item, FIELD_CATEGORY) != category {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn timestamp_has_seconds_precision() {
        let now = timestamp_now();
        assert_eq!(now.len(), "2026-10-15T12:00:00Z".len());
        assert!(now.ends_with('Z'));
    }

    #[test]
    fn refreshed_updated_at_never_precedes_creation() {
        let future = "2999-01-01T00:00:00Z";
        assert_eq!(refreshed_updated_at(Some(future)), future);

        let past = "2000-01-01T00:00:00Z";
        assert!(refreshed_updated_at(Some(past)).as_str() > past);
        assert_eq!(refreshed_updated_at(None).len(), past.len());
    }

    #[test]
    fn merge_skips_nulls() {
        let mut target = item(json!({"name": "luna", "note": "mango"}));
        merge_non_null(
            &mut target,
            item(json!({"name": "sol", "note": null, "age": 4})),
        );
        assert_eq!(target["name"], "sol");
        assert_eq!(target["note"], "mango");
        assert_eq!(target["age"], 4);
    }

    #[test]
    fn filter_name_is_substring_category_is_exact() {
        let luna = item(json!({"name": "Luna", "category": "marmoset"}));

        assert!(ListFilter::new().with_name("UN").matches(&luna));
        assert!(ListFilter::new().with_category(" Marmoset ").matches(&luna));
        assert!(!ListFilter::new().with_category("marmo").matches(&luna));
        assert!(!ListFilter::new()
            .with_name("luna")
            .with_category("macaque")
            .matches(&luna));
    }

    #[test]
    fn blank_filter_is_empty() {
        let filter = ListFilter::new().with_name("  ").with_category("");
        assert!(filter.is_empty());
        assert!(filter.matches(&Item::new()));
    }

    #[test]
    fn search_needle_rejects_blank() {
        assert_eq!(search_needle("   "), None);
        assert_eq!(search_needle(" Marmo "), Some("marmo".to_string()));
    }

    #[test]
    fn search_matches_name_or_category() {
        let luna = item(json!({"name": "luna", "category": "marmoset"}));
        assert!(matches_search(&luna, "marmo"));
        assert!(matches_search(&luna, "lu"));
        assert!(!matches_search(&luna, "howler"));
    }

    #[test]
    fn natural_key_ignores_case_and_whitespace() {
        let luna = item(json!({"name": "luna", "category": "marmoset"}));
        assert!(matches_natural_key(&luna, "  LUNA ", "MARMOSET"));
        assert!(!matches_natural_key(&luna, "luna", "macaque"));
        assert!(!matches_natural_key(&luna, "lun", "marmoset"));
    }
}
