//! Client abstraction for the remote key-value table.
//!
//! [`KvClient`] is the seam between [`super::KvStore`] and the actual
//! transport. A production client translates these calls into the hosted
//! service's API; [`super::InMemoryKvClient`] serves tests and offline use.

use super::attribute::{AttributeValue, KvItem};
use crate::error::StorageError;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for key-value client calls.
pub type KvResult<T> = Result<T, KvError>;

/// Errors reported by a key-value client.
#[derive(Debug, Error)]
pub enum KvError {
    /// A conditional write or delete did not hold.
    #[error("conditional check failed")]
    ConditionFailed,

    /// The table does not exist or is not active.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The request was rejected as invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// Credentials were missing or refused.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Network or service failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl KvError {
    /// Classifies a service error by its error code.
    ///
    /// Codes follow the hosted table's naming; unknown or missing codes
    /// are treated as transport failures.
    pub fn from_service_code(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some("ConditionalCheckFailedException") => Self::ConditionFailed,
            Some("ResourceNotFoundException") => Self::TableNotFound(message),
            Some("ValidationException") => Self::Validation(message),
            Some(
                "AccessDeniedException"
                | "UnrecognizedClientException"
                | "MissingAuthenticationTokenException"
                | "ExpiredTokenException",
            ) => Self::AccessDenied(message),
            _ => Self::Transport(message),
        }
    }
}

impl From<KvError> for StorageError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Validation(message) => StorageError::malformed_item(message),
            other => StorageError::backend_unavailable(other.to_string()),
        }
    }
}

/// Composite primary key of a table item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    /// Partition component.
    pub partition_key: String,
    /// Sort component.
    pub sort_key: String,
}

impl ItemKey {
    /// Creates a key from its two components.
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// A precondition on the item currently stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// No stored item has this attribute (i.e. the key is free).
    AttributeNotExists(String),
    /// The stored item has this attribute (i.e. the key is taken).
    AttributeExists(String),
}

impl WriteCondition {
    /// Evaluates the condition against the currently stored item.
    #[must_use]
    pub fn holds(&self, current: Option<&KvItem>) -> bool {
        match self {
            Self::AttributeNotExists(attr) => current.map_or(true, |it| !it.contains_key(attr)),
            Self::AttributeExists(attr) => current.map_or(false, |it| it.contains_key(attr)),
        }
    }
}

/// A scan filter over item attributes.
///
/// Clients that support server-side filtering translate this tree into
/// their filter expression language; others call [`Condition::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Attribute equals the value.
    Eq(String, AttributeValue),
    /// String attribute contains the substring.
    Contains(String, String),
    /// All conditions hold.
    And(Vec<Condition>),
    /// At least one condition holds.
    Or(Vec<Condition>),
}

impl Condition {
    /// `attr = value` for a string value.
    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq(attr.into(), AttributeValue::S(value.into()))
    }

    /// `contains(attr, needle)`.
    pub fn contains(attr: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains(attr.into(), needle.into())
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Evaluates the condition against an item.
    #[must_use]
    pub fn matches(&self, item: &KvItem) -> bool {
        match self {
            Self::Eq(attr, value) => item.get(attr) == Some(value),
            Self::Contains(attr, needle) => item
                .get(attr)
                .and_then(AttributeValue::as_s)
                .is_some_and(|s| s.contains(needle.as_str())),
            Self::And(all) => all.iter().all(|c| c.matches(item)),
            Self::Or(any) => any.iter().any(|c| c.matches(item)),
        }
    }
}

/// A [`Condition`] rendered as a server-side filter expression.
///
/// Attribute names and values are bound through placeholders (`#a0`,
/// `:v0`, ...), so reserved words and arbitrary values are safe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    /// The expression text.
    pub expression: String,
    /// Name placeholders to attribute names.
    pub names: BTreeMap<String, String>,
    /// Value placeholders to values.
    pub values: BTreeMap<String, AttributeValue>,
}

impl Condition {
    /// Renders the condition as a filter expression.
    ///
    /// `And` and `Or` must not be empty.
    #[must_use]
    pub fn to_filter_expression(&self) -> FilterExpression {
        let mut out = FilterExpression::default();
        out.expression = self.render(&mut out.names, &mut out.values);
        out
    }

    fn render(
        &self,
        names: &mut BTreeMap<String, String>,
        values: &mut BTreeMap<String, AttributeValue>,
    ) -> String {
        match self {
            Self::Eq(attr, value) => {
                let name = name_placeholder(names, attr);
                format!("{name} = {}", value_placeholder(values, value.clone()))
            }
            Self::Contains(attr, needle) => {
                let name = name_placeholder(names, attr);
                let value = value_placeholder(values, AttributeValue::S(needle.clone()));
                format!("contains({name}, {value})")
            }
            Self::And(all) => Self::render_all(all, " AND ", names, values),
            Self::Or(any) => Self::render_all(any, " OR ", names, values),
        }
    }

    fn render_all(
        conditions: &[Condition],
        separator: &str,
        names: &mut BTreeMap<String, String>,
        values: &mut BTreeMap<String, AttributeValue>,
    ) -> String {
        let mut parts = Vec::with_capacity(conditions.len());
        for condition in conditions {
            parts.push(condition.render(names, values));
        }
        format!("({})", parts.join(separator))
    }
}

fn name_placeholder(names: &mut BTreeMap<String, String>, attr: &str) -> String {
    if let Some((placeholder, _)) = names.iter().find(|(_, name)| name.as_str() == attr) {
        return placeholder.clone();
    }
    let placeholder = format!("#a{}", names.len());
    names.insert(placeholder.clone(), attr.to_string());
    placeholder
}

fn value_placeholder(
    values: &mut BTreeMap<String, AttributeValue>,
    value: AttributeValue,
) -> String {
    let placeholder = format!(":v{}", values.len());
    values.insert(placeholder.clone(), value);
    placeholder
}

/// One page of scan results.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Items of this page that passed the filter.
    pub items: Vec<KvItem>,
    /// Where the next page starts; `None` when the scan is complete.
    pub last_evaluated_key: Option<ItemKey>,
}

/// A blocking client for a remote key-value table.
///
/// Implement this trait to bind the store to a concrete service. Calls are
/// made synchronously and are not retried; every failure surfaces to the
/// caller.
pub trait KvClient: Send + Sync {
    /// Writes a whole item, replacing any item with the same key.
    ///
    /// With a condition, the write happens only if it holds; otherwise
    /// [`KvError::ConditionFailed`] is returned and nothing is written.
    fn put_item(&self, table: &str, item: KvItem, condition: Option<&WriteCondition>)
        -> KvResult<()>;

    /// Reads the item stored under `key`.
    fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<KvItem>>;

    /// Deletes the item stored under `key`.
    ///
    /// Without a condition, deleting an absent key succeeds.
    fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()>;

    /// Reads one page of the table, starting after `start_key`.
    ///
    /// The filter is applied after the page is read, so a page may hold
    /// fewer items than the page size, or none, while more pages remain.
    fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        start_key: Option<&ItemKey>,
    ) -> KvResult<ScanPage>;
}

impl<C: KvClient + ?Sized> KvClient for Box<C> {
    fn put_item(
        &self,
        table: &str,
        item: KvItem,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        (**self).put_item(table, item, condition)
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<KvItem>> {
        (**self).get_item(table, key)
    }

    fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        (**self).delete_item(table, key, condition)
    }

    fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        start_key: Option<&ItemKey>,
    ) -> KvResult<ScanPage> {
        (**self).scan(table, filter, start_key)
    }
}

impl<C: KvClient + ?Sized> KvClient for Arc<C> {
    fn put_item(
        &self,
        table: &str,
        item: KvItem,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        (**self).put_item(table, item, condition)
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<KvItem>> {
        (**self).get_item(table, key)
    }

    fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        (**self).delete_item(table, key, condition)
    }

    fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        start_key: Option<&ItemKey>,
    ) -> KvResult<ScanPage> {
        (**self).scan(table, filter, start_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, &str)]) -> KvItem {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttributeValue::s(*v)))
            .collect()
    }

    #[test]
    fn write_conditions() {
        let stored = item(&[("PK", "MONKEY#1")]);
        let absent = WriteCondition::AttributeNotExists("PK".into());
        let present = WriteCondition::AttributeExists("PK".into());

        assert!(absent.holds(None));
        assert!(!absent.holds(Some(&stored)));
        assert!(!present.holds(None));
        assert!(present.holds(Some(&stored)));
    }

    #[test]
    fn condition_tree() {
        let luna = item(&[("entity", "MONKEY"), ("name_lc", "luna"), ("category_lc", "marmoset")]);

        let cond = Condition::eq("entity", "MONKEY").and(Condition::Or(vec![
            Condition::contains("name_lc", "marmo"),
            Condition::contains("category_lc", "marmo"),
        ]));
        assert!(cond.matches(&luna));

        let cond = Condition::eq("entity", "MONKEY").and(Condition::eq("category_lc", "howler"));
        assert!(!cond.matches(&luna));
        assert!(!Condition::contains("missing", "x").matches(&luna));
    }

    #[test]
    fn and_flattens() {
        let cond = Condition::eq("a", "1")
            .and(Condition::eq("b", "2"))
            .and(Condition::eq("c", "3"));
        assert!(matches!(cond, Condition::And(ref all) if all.len() == 3));
    }

    #[test]
    fn filter_expression_binds_placeholders() {
        let cond = Condition::eq("entity", "MONKEY").and(Condition::Or(vec![
            Condition::contains("name_lc", "marmo"),
            Condition::contains("category_lc", "marmo"),
        ]));
        let filter = cond.to_filter_expression();

        assert_eq!(
            filter.expression,
            "(#a0 = :v0 AND (contains(#a1, :v1) OR contains(#a2, :v2)))"
        );
        assert_eq!(filter.names["#a0"], "entity");
        assert_eq!(filter.names["#a2"], "category_lc");
        assert_eq!(filter.values[":v0"], AttributeValue::s("MONKEY"));
        assert_eq!(filter.values[":v2"], AttributeValue::s("marmo"));
    }

    #[test]
    fn filter_expression_reuses_name_placeholders() {
        let cond = Condition::eq("entity", "MONKEY").and(Condition::eq("entity", "APE"));
        let filter = cond.to_filter_expression();
        assert_eq!(filter.expression, "(#a0 = :v0 AND #a0 = :v1)");
        assert_eq!(filter.names.len(), 1);
        assert_eq!(filter.values.len(), 2);
    }

    #[test]
    fn service_codes_classify_errors() {
        assert!(matches!(
            KvError::from_service_code(Some("ConditionalCheckFailedException"), "x"),
            KvError::ConditionFailed
        ));
        assert!(matches!(
            KvError::from_service_code(Some("ResourceNotFoundException"), "no table"),
            KvError::TableNotFound(ref m) if m == "no table"
        ));
        assert!(matches!(
            KvError::from_service_code(Some("ValidationException"), "bad key"),
            KvError::Validation(_)
        ));
        assert!(matches!(
            KvError::from_service_code(Some("UnrecognizedClientException"), "who"),
            KvError::AccessDenied(_)
        ));
        assert!(matches!(
            KvError::from_service_code(None, "dispatch failure"),
            KvError::Transport(_)
        ));
    }

    #[test]
    fn errors_map_to_storage_errors() {
        let err: StorageError = KvError::Transport("connection reset".into()).into();
        assert!(err.is_unavailable());

        let err: StorageError = KvError::Validation("missing key".into()).into();
        assert!(matches!(err, StorageError::MalformedItem { .. }));
    }
}
