//! In-process key-value table for testing.

use super::attribute::KvItem;
use super::client::{Condition, ItemKey, KvClient, KvError, KvResult, ScanPage, WriteCondition};
use super::store::{PARTITION_KEY_ATTR, SORT_KEY_ATTR};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of items evaluated per scan page.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

type Table = BTreeMap<ItemKey, KvItem>;

/// A [`KvClient`] holding its tables in memory.
///
/// Behaves like a hosted table for the operations the store uses:
/// conditional writes, key-ordered paginated scans with post-read filters,
/// and errors for unknown tables. It is suitable for:
/// - Unit and integration tests
/// - Offline development without a hosted table
///
/// # Example
///
/// ```rust
/// use monkeyreg_storage::{InMemoryKvClient, KvClient};
///
/// let client = InMemoryKvClient::new().with_table("monkey-registry");
/// let page = client.scan("monkey-registry", None, None).unwrap();
/// assert!(page.items.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryKvClient {
    tables: RwLock<HashMap<String, Table>>,
    page_size: usize,
    available: AtomicBool,
}

impl Default for InMemoryKvClient {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: DEFAULT_SCAN_PAGE_SIZE,
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryKvClient {
    /// Creates a client with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the named table and returns the client.
    #[must_use]
    pub fn with_table(self, table: &str) -> Self {
        self.create_table(table);
        self
    }

    /// Sets how many items a scan page evaluates.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Creates an empty table if it does not exist.
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(table.to_string()).or_default();
    }

    /// Makes every subsequent call fail with a transport error, or
    /// restores service.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of items stored in a table.
    #[must_use]
    pub fn item_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    /// Returns a copy of the raw item stored under `key`.
    #[must_use]
    pub fn raw_item(&self, table: &str, key: &ItemKey) -> Option<KvItem> {
        self.tables.read().get(table)?.get(key).cloned()
    }

    fn check_available(&self) -> KvResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KvError::Transport("endpoint unreachable".into()))
        }
    }

    fn key_of(item: &KvItem) -> KvResult<ItemKey> {
        let part = |attr: &str| {
            item.get(attr)
                .and_then(|v| v.as_s())
                .map(str::to_string)
                .ok_or_else(|| KvError::Validation(format!("item is missing key attribute {attr}")))
        };
        Ok(ItemKey::new(part(PARTITION_KEY_ATTR)?, part(SORT_KEY_ATTR)?))
    }
}

impl KvClient for InMemoryKvClient {
    fn put_item(
        &self,
        table: &str,
        item: KvItem,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        self.check_available()?;
        let key = Self::key_of(&item)?;

        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| KvError::TableNotFound(table.to_string()))?;

        if let Some(condition) = condition {
            if !condition.holds(rows.get(&key)) {
                return Err(KvError::ConditionFailed);
            }
        }
        rows.insert(key, item);
        Ok(())
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<KvItem>> {
        self.check_available()?;
        let tables = self.tables.read();
        let rows = tables
            .get(table)
            .ok_or_else(|| KvError::TableNotFound(table.to_string()))?;
        Ok(rows.get(key).cloned())
    }

    fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| KvError::TableNotFound(table.to_string()))?;

        if let Some(condition) = condition {
            if !condition.holds(rows.get(key)) {
                return Err(KvError::ConditionFailed);
            }
        }
        rows.remove(key);
        Ok(())
    }

    fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        start_key: Option<&ItemKey>,
    ) -> KvResult<ScanPage> {
        self.check_available()?;
        let tables = self.tables.read();
        let rows = tables
            .get(table)
            .ok_or_else(|| KvError::TableNotFound(table.to_string()))?;

        let lower = match start_key {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let mut evaluated = rows.range((lower, Bound::Unbounded));

        let mut page = ScanPage::default();
        let mut last_key = None;
        for (key, item) in evaluated.by_ref().take(self.page_size) {
            last_key = Some(key.clone());
            if filter.map_or(true, |f| f.matches(item)) {
                page.items.push(item.clone());
            }
        }

        if evaluated.next().is_some() {
            page.last_evaluated_key = last_key;
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::attribute::AttributeValue;

    const TABLE: &str = "monkeys";

    fn item(id: &str) -> KvItem {
        let key = format!("MONKEY#{id}");
        [
            (PARTITION_KEY_ATTR, AttributeValue::s(&key)),
            (SORT_KEY_ATTR, AttributeValue::s(&key)),
            ("id", AttributeValue::s(id)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::new(format!("MONKEY#{id}"), format!("MONKEY#{id}"))
    }

    #[test]
    fn put_get_delete() {
        let client = InMemoryKvClient::new().with_table(TABLE);
        client.put_item(TABLE, item("a"), None).unwrap();

        assert!(client.get_item(TABLE, &key("a")).unwrap().is_some());
        assert_eq!(client.item_count(TABLE), 1);

        client.delete_item(TABLE, &key("a"), None).unwrap();
        assert!(client.get_item(TABLE, &key("a")).unwrap().is_none());

        // Unconditional delete of an absent key succeeds.
        client.delete_item(TABLE, &key("a"), None).unwrap();
    }

    #[test]
    fn conditional_put_rejects_existing_key() {
        let client = InMemoryKvClient::new().with_table(TABLE);
        let guard = WriteCondition::AttributeNotExists(PARTITION_KEY_ATTR.into());

        client.put_item(TABLE, item("a"), Some(&guard)).unwrap();
        let result = client.put_item(TABLE, item("a"), Some(&guard));
        assert!(matches!(result, Err(KvError::ConditionFailed)));
    }

    #[test]
    fn conditional_delete_rejects_absent_key() {
        let client = InMemoryKvClient::new().with_table(TABLE);
        let guard = WriteCondition::AttributeExists(PARTITION_KEY_ATTR.into());

        let result = client.delete_item(TABLE, &key("a"), Some(&guard));
        assert!(matches!(result, Err(KvError::ConditionFailed)));
    }

    #[test]
    fn put_without_key_is_rejected() {
        let client = InMemoryKvClient::new().with_table(TABLE);
        let result = client.put_item(TABLE, KvItem::new(), None);
        assert!(matches!(result, Err(KvError::Validation(_))));
    }

    #[test]
    fn unknown_table_fails() {
        let client = InMemoryKvClient::new();
        let result = client.get_item("nope", &key("a"));
        assert!(matches!(result, Err(KvError::TableNotFound(_))));
    }

    #[test]
    fn unavailable_client_fails() {
        let client = InMemoryKvClient::new().with_table(TABLE);
        client.set_available(false);
        let result = client.scan(TABLE, None, None);
        assert!(matches!(result, Err(KvError::Transport(_))));

        client.set_available(true);
        assert!(client.scan(TABLE, None, None).is_ok());
    }

    #[test]
    fn scan_paginates() {
        let client = InMemoryKvClient::new().with_table(TABLE).with_page_size(2);
        for id in ["a", "b", "c", "d", "e"] {
            client.put_item(TABLE, item(id), None).unwrap();
        }

        let mut seen = Vec::new();
        let mut start = None;
        let mut pages = 0;
        loop {
            let page = client.scan(TABLE, None, start.as_ref()).unwrap();
            pages += 1;
            seen.extend(page.items);
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn scan_filters_after_reading() {
        let client = InMemoryKvClient::new().with_table(TABLE).with_page_size(2);
        for id in ["a", "b", "c"] {
            client.put_item(TABLE, item(id), None).unwrap();
        }

        let filter = Condition::eq("id", "c");
        let first = client.scan(TABLE, Some(&filter), None).unwrap();
        assert!(first.items.is_empty());
        assert!(first.last_evaluated_key.is_some());

        let second = client
            .scan(TABLE, Some(&filter), first.last_evaluated_key.as_ref())
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.last_evaluated_key.is_none());
    }
}
