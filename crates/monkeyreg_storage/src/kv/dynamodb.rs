//! [`KvClient`] for Amazon DynamoDB.
//!
//! Enabled by the `dynamodb` feature. The SDK is asynchronous; the client
//! owns a current-thread Tokio runtime and blocks on each call, so it must
//! not be called from inside another Tokio runtime.
//!
//! ## Usage
//!
//! ```ignore
//! use monkeyreg_storage::{DynamoDbClient, KvStore, KvStoreConfig};
//!
//! let config = KvStoreConfig::default();
//! let client = DynamoDbClient::connect(&config.region)?;
//! let store = KvStore::new(client, config);
//! ```

use super::attribute::{AttributeValue, KvItem};
use super::client::{Condition, ItemKey, KvClient, KvError, KvResult, ScanPage, WriteCondition};
use super::store::{PARTITION_KEY_ATTR, SORT_KEY_ATTR};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::fmt;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

type SdkItem = HashMap<String, SdkValue>;

/// Placeholder bound to the attribute named in a [`WriteCondition`].
const CONDITION_NAME: &str = "#k";

/// A blocking DynamoDB client.
///
/// Reads and scans are strongly consistent, so a write is visible to the
/// uniqueness check that follows it.
pub struct DynamoDbClient {
    client: Client,
    runtime: Runtime,
}

impl DynamoDbClient {
    /// Wraps an already configured SDK client.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Transport`] if the runtime cannot be started.
    pub fn new(client: Client) -> KvResult<Self> {
        Ok(Self {
            client,
            runtime: build_runtime()?,
        })
    }

    /// Loads credentials from the environment and connects to `region`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Transport`] if the runtime cannot be started.
    pub fn connect(region: &str) -> KvResult<Self> {
        let runtime = build_runtime()?;
        let config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load(),
        );
        debug!(region, "loaded DynamoDB client configuration");
        Ok(Self {
            client: Client::new(&config),
            runtime,
        })
    }
}

impl fmt::Debug for DynamoDbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamoDbClient").finish_non_exhaustive()
    }
}

impl KvClient for DynamoDbClient {
    fn put_item(
        &self,
        table: &str,
        item: KvItem,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(&item)));
        if let Some(condition) = condition {
            let (expression, attr) = condition_expression(condition);
            request = request
                .condition_expression(expression)
                .expression_attribute_names(CONDITION_NAME, attr);
        }
        self.runtime
            .block_on(request.send())
            .map_err(map_sdk_error)?;
        Ok(())
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<KvItem>> {
        let request = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key_map(key)))
            .consistent_read(true);
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(map_sdk_error)?;
        output.item().map(from_sdk_item).transpose()
    }

    fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&WriteCondition>,
    ) -> KvResult<()> {
        let mut request = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(key_map(key)));
        if let Some(condition) = condition {
            let (expression, attr) = condition_expression(condition);
            request = request
                .condition_expression(expression)
                .expression_attribute_names(CONDITION_NAME, attr);
        }
        self.runtime
            .block_on(request.send())
            .map_err(map_sdk_error)?;
        Ok(())
    }

    fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        start_key: Option<&ItemKey>,
    ) -> KvResult<ScanPage> {
        let mut request = self
            .client
            .scan()
            .table_name(table)
            .consistent_read(true)
            .set_exclusive_start_key(start_key.map(key_map));
        if let Some(filter) = filter {
            let rendered = filter.to_filter_expression();
            request = request
                .filter_expression(rendered.expression)
                .set_expression_attribute_names(Some(rendered.names.into_iter().collect()))
                .set_expression_attribute_values(Some(
                    rendered
                        .values
                        .iter()
                        .map(|(placeholder, value)| (placeholder.clone(), to_sdk(value)))
                        .collect(),
                ));
        }

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(map_sdk_error)?;
        let items = output
            .items()
            .iter()
            .map(from_sdk_item)
            .collect::<KvResult<Vec<_>>>()?;
        let last_evaluated_key = output.last_evaluated_key().map(key_from_map).transpose()?;
        debug!(table, count = items.len(), more = last_evaluated_key.is_some(), "scanned page");
        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }
}

fn build_runtime() -> KvResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| KvError::Transport(format!("failed to start runtime: {e}")))
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> KvError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_string);
    KvError::from_service_code(err.code(), message)
}

fn condition_expression(condition: &WriteCondition) -> (String, String) {
    match condition {
        WriteCondition::AttributeNotExists(attr) => {
            (format!("attribute_not_exists({CONDITION_NAME})"), attr.clone())
        }
        WriteCondition::AttributeExists(attr) => {
            (format!("attribute_exists({CONDITION_NAME})"), attr.clone())
        }
    }
}

fn to_sdk(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null => SdkValue::Null(true),
    }
}

fn from_sdk(name: &str, value: &SdkValue) -> KvResult<AttributeValue> {
    match value {
        SdkValue::S(s) => Ok(AttributeValue::S(s.clone())),
        SdkValue::N(n) => Ok(AttributeValue::N(n.clone())),
        SdkValue::Bool(b) => Ok(AttributeValue::Bool(*b)),
        SdkValue::Null(_) => Ok(AttributeValue::Null),
        other => Err(KvError::Validation(format!(
            "attribute {name} has an unsupported type: {other:?}"
        ))),
    }
}

fn to_sdk_item(item: &KvItem) -> SdkItem {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk(value)))
        .collect()
}

fn from_sdk_item(item: &SdkItem) -> KvResult<KvItem> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), from_sdk(name, value)?)))
        .collect()
}

fn key_map(key: &ItemKey) -> SdkItem {
    HashMap::from([
        (
            PARTITION_KEY_ATTR.to_string(),
            SdkValue::S(key.partition_key.clone()),
        ),
        (SORT_KEY_ATTR.to_string(), SdkValue::S(key.sort_key.clone())),
    ])
}

fn key_from_map(map: &SdkItem) -> KvResult<ItemKey> {
    let component = |attr: &str| match map.get(attr) {
        Some(SdkValue::S(s)) => Ok(s.clone()),
        _ => Err(KvError::Validation(format!(
            "last evaluated key has no string {attr}"
        ))),
    };
    Ok(ItemKey::new(
        component(PARTITION_KEY_ATTR)?,
        component(SORT_KEY_ATTR)?,
    ))
}
