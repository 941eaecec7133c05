//! The validated record and its raw-field constructors.
//!
//! A [`Record`] can only be obtained through validation: [`Record::new`]
//! for fresh records, [`Record::from_item`] for stored mappings. Partial
//! updates go through [`Record::apply`], which either commits every field
//! of a [`RecordPatch`] or leaves the record untouched.

use crate::category::Category;
use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use monkeyreg_storage::{
    refreshed_updated_at, timestamp_now, Item, FIELD_AGE, FIELD_CATEGORY, FIELD_CREATED_AT,
    FIELD_ID, FIELD_LAST_CHECK_TIME, FIELD_NAME, FIELD_NOTE, FIELD_UPDATED_AT,
};
use serde_json::Value;
use uuid::Uuid;

/// Prefix of generated record ids.
pub const ID_PREFIX: &str = "monkey_";

/// Shortest allowed name, after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// Longest allowed name, after trimming.
pub const MAX_NAME_LEN: usize = 40;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Generates a fresh record id: `monkey_` followed by 8 hex characters.
#[must_use]
pub fn generate_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{ID_PREFIX}{}", &hex[..8])
}

/// Trims a name and checks its length.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidName`] if the trimmed name is shorter
/// than [`MIN_NAME_LEN`] or longer than [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&length) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidName { length })
    }
}

/// Checks an age against the limit of its category.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidAge`] if the age is negative or above
/// [`Category::max_age`].
pub fn validate_age(age: i64, category: Category) -> Result<u32, ValidationError> {
    let max = category.max_age();
    u32::try_from(age)
        .ok()
        .filter(|a| *a <= max)
        .ok_or(ValidationError::InvalidAge {
            age,
            max,
            category: category.as_str(),
        })
}

/// Checks that a value parses as an ISO-8601 date or datetime.
///
/// Accepts RFC 3339, datetimes separated by `T` or a space with or without
/// a numeric offset, times given to the hour or minute, and bare dates.
/// Fractional seconds and a trailing `Z` are allowed.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimestamp`] otherwise.
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let naive = |text: &str| {
        NAIVE_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
    };
    let parses = DateTime::parse_from_rfc3339(value).is_ok()
        || OFFSET_FORMATS
            .iter()
            .any(|fmt| DateTime::parse_from_str(value, fmt).is_ok())
        || naive(value.strip_suffix('Z').unwrap_or(value))
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || is_hour_only(value);

    if parses {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimestamp {
            value: value.to_string(),
        })
    }
}

// `2024-05-01T10` and `2024-05-01 10`.
fn is_hour_only(value: &str) -> bool {
    let Some((date, hour)) = value.split_at_checked(10) else {
        return false;
    };
    let Some(hour) = hour.strip_prefix(['T', ' ']) else {
        return false;
    };
    hour.len() == 2
        && hour.bytes().all(|b| b.is_ascii_digit())
        && NaiveDateTime::parse_from_str(&format!("{date}T{hour}:00"), "%Y-%m-%dT%H:%M").is_ok()
}

/// Caller-supplied fields of a record that does not exist yet.
///
/// Nothing is checked until the value reaches [`Record::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Display name, trimmed on validation.
    pub name: String,
    /// Category name, any case.
    pub category: String,
    /// Age in years.
    pub age: i64,
    /// Free text; empty by default.
    pub note: String,
    /// Optional ISO-8601 timestamp of the last check.
    pub last_check_time: Option<String>,
}

impl NewRecord {
    /// Creates the required fields of a new record.
    pub fn new(name: impl Into<String>, category: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            age,
            note: String::new(),
            last_check_time: None,
        }
    }

    /// Sets the note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Sets the last check time.
    #[must_use]
    pub fn last_check_time(mut self, value: impl Into<String>) -> Self {
        self.last_check_time = Some(value.into());
        self
    }

    /// Reads the fields from a raw mapping.
    ///
    /// `name`, `category` and `age` are required. A missing or null `note`
    /// becomes empty; a missing or null `last_check_time` stays absent.
    /// Other keys, including `id` and the timestamps, are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] or
    /// [`ValidationError::InvalidType`] for unusable fields. Range checks
    /// happen later, in [`Record::new`].
    pub fn from_item(raw: &Item) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_str(raw, FIELD_NAME)?,
            category: required_str(raw, FIELD_CATEGORY)?,
            age: required_age(raw)?,
            note: optional_str(raw, FIELD_NOTE)?.unwrap_or_default(),
            last_check_time: optional_str(raw, FIELD_LAST_CHECK_TIME)?,
        })
    }
}

/// A partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New age.
    pub age: Option<i64>,
    /// New note.
    pub note: Option<String>,
    /// New last check time.
    pub last_check_time: Option<String>,
}

impl RecordPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the age.
    #[must_use]
    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    /// Sets the note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the last check time.
    #[must_use]
    pub fn last_check_time(mut self, value: impl Into<String>) -> Self {
        self.last_check_time = Some(value.into());
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.age.is_none()
            && self.note.is_none()
            && self.last_check_time.is_none()
    }

    /// Reads a patch from a raw mapping. Missing and null keys are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidType`] for present fields of the
    /// wrong type.
    pub fn from_item(raw: &Item) -> Result<Self, ValidationError> {
        let age = match raw.get(FIELD_AGE) {
            None | Some(Value::Null) => None,
            Some(value) => Some(age_from_value(value)?),
        };
        Ok(Self {
            name: optional_str(raw, FIELD_NAME)?,
            category: optional_str(raw, FIELD_CATEGORY)?,
            age,
            note: optional_str(raw, FIELD_NOTE)?,
            last_check_time: optional_str(raw, FIELD_LAST_CHECK_TIME)?,
        })
    }
}

impl From<NewRecord> for RecordPatch {
    fn from(new: NewRecord) -> Self {
        Self {
            name: Some(new.name),
            category: Some(new.category),
            age: Some(new.age),
            note: Some(new.note),
            last_check_time: new.last_check_time,
        }
    }
}

/// A validated registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    name: String,
    category: Category,
    age: u32,
    note: String,
    last_check_time: Option<String>,
    created_at: String,
    updated_at: String,
}

impl Record {
    /// Validates caller input and creates a record with a fresh id and
    /// both timestamps set to now.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn new(new: NewRecord) -> Result<Self, ValidationError> {
        let now = timestamp_now();
        Self::build(generate_id(), new, now.clone(), now)
    }

    /// Rebuilds a record from a stored mapping, validating every field.
    ///
    /// A present id and present timestamps are kept; a missing id is
    /// generated and missing timestamps default to now.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the mapping does not describe a
    /// valid record.
    pub fn from_item(item: &Item) -> Result<Self, ValidationError> {
        let id = optional_str(item, FIELD_ID)?.unwrap_or_else(generate_id);
        let created_at = optional_str(item, FIELD_CREATED_AT)?.unwrap_or_else(timestamp_now);
        let updated_at =
            optional_str(item, FIELD_UPDATED_AT)?.unwrap_or_else(|| created_at.clone());
        validate_timestamp(&created_at)?;
        validate_timestamp(&updated_at)?;
        Self::build(id, NewRecord::from_item(item)?, created_at, updated_at)
    }

    fn build(
        id: String,
        new: NewRecord,
        created_at: String,
        updated_at: String,
    ) -> Result<Self, ValidationError> {
        let name = validate_name(&new.name)?;
        let category = Category::parse(&new.category)?;
        let age = validate_age(new.age, category)?;
        // A blank check time is kept as given and never parsed.
        if let Some(value) = new.last_check_time.as_deref().filter(|v| !v.trim().is_empty()) {
            validate_timestamp(value)?;
        }
        Ok(Self {
            id,
            name,
            category,
            age,
            note: new.note,
            last_check_time: new.last_check_time,
            created_at,
            updated_at,
        })
    }

    /// Returns the record id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the trimmed name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the age in years.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Returns the note.
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Returns the last check time, if recorded.
    pub fn last_check_time(&self) -> Option<&str> {
        self.last_check_time.as_deref()
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Returns the last modification timestamp.
    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    /// Returns the uniqueness key: the trimmed name and canonical category.
    ///
    /// Both the create and the update path compare records through this.
    pub fn natural_key(&self) -> (&str, &'static str) {
        (&self.name, self.category.as_str())
    }

    /// Applies a patch and refreshes `updated_at`.
    ///
    /// The patched record is validated as a whole, so a new category is
    /// checked against the existing age and vice versa. On error the record
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn apply(&mut self, patch: &RecordPatch) -> Result<(), ValidationError> {
        let merged = NewRecord {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            category: patch
                .category
                .clone()
                .unwrap_or_else(|| self.category.as_str().to_string()),
            age: patch.age.unwrap_or(i64::from(self.age)),
            note: patch.note.clone().unwrap_or_else(|| self.note.clone()),
            last_check_time: patch
                .last_check_time
                .clone()
                .or_else(|| self.last_check_time.clone()),
        };

        let updated_at = refreshed_updated_at(Some(&self.created_at));
        *self = Self::build(self.id.clone(), merged, self.created_at.clone(), updated_at)?;
        Ok(())
    }

    /// Serializes to the canonical mapping.
    ///
    /// Keys come out in canonical order; `category` is lowercase and an
    /// absent `last_check_time` is `null`.
    #[must_use]
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(FIELD_ID.into(), Value::from(self.id.as_str()));
        item.insert(FIELD_NAME.into(), Value::from(self.name.as_str()));
        item.insert(FIELD_CATEGORY.into(), Value::from(self.category.as_str()));
        item.insert(FIELD_AGE.into(), Value::from(self.age));
        item.insert(FIELD_NOTE.into(), Value::from(self.note.as_str()));
        item.insert(
            FIELD_LAST_CHECK_TIME.into(),
            self.last_check_time
                .as_deref()
                .map_or(Value::Null, Value::from),
        );
        item.insert(FIELD_CREATED_AT.into(), Value::from(self.created_at.as_str()));
        item.insert(FIELD_UPDATED_AT.into(), Value::from(self.updated_at.as_str()));
        item
    }
}

fn required_str(raw: &Item, field: &'static str) -> Result<String, ValidationError> {
    optional_str(raw, field)?.ok_or(ValidationError::MissingField { field })
}

fn optional_str(raw: &Item, field: &'static str) -> Result<Option<String>, ValidationError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

fn required_age(raw: &Item) -> Result<i64, ValidationError> {
    match raw.get(FIELD_AGE) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { field: FIELD_AGE }),
        Some(value) => age_from_value(value),
    }
}

// Integral floats are accepted; 7.5 and "7" are not.
fn age_from_value(value: &Value) -> Result<i64, ValidationError> {
    let age = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    age.ok_or(ValidationError::InvalidType {
        field: FIELD_AGE,
        expected: "an integer",
    })
}
