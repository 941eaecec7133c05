//! Property-based test generators using proptest.
//!
//! Provides strategies for generating record input that is valid, or
//! invalid in one specific way.

use monkeyreg_core::{Category, NewRecord, CAPPED_MAX_AGE, MAX_AGE};
use proptest::prelude::*;

/// Strategy for generating categories.
pub fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

/// Strategy for generating categories other than the capped one.
pub fn uncapped_category_strategy() -> impl Strategy<Value = Category> {
    category_strategy().prop_filter("Category must not be capped", |c| *c != Category::CAPPED)
}

/// Strategy for generating valid trimmed names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 '-]{0,38}[A-Za-z0-9]")
        .expect("Invalid regex")
}

/// Strategy for generating surrounding whitespace.
pub fn padding_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ \t]{0,3}").expect("Invalid regex")
}

/// Renders a category in a random case mix.
pub fn cased_category_strategy(category: Category) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), category.as_str().len()).prop_map(move |upper| {
        category
            .as_str()
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

/// Strategy for generating optional ISO-8601 check times.
pub fn check_time_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        (2000i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
            |(y, mo, d, h, mi, s)| format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}"),
        ),
    )
}

/// Strategy for generating a valid age for a category.
pub fn age_strategy(category: Category) -> impl Strategy<Value = i64> {
    0..=i64::from(category.max_age())
}

/// Strategy for generating valid creation input.
pub fn new_record_strategy() -> impl Strategy<Value = NewRecord> {
    category_strategy().prop_flat_map(|category| {
        (
            name_strategy(),
            cased_category_strategy(category),
            age_strategy(category),
            prop::string::string_regex("[ -~]{0,60}").expect("Invalid regex"),
            check_time_strategy(),
        )
            .prop_map(|(name, category, age, note, last_check_time)| NewRecord {
                name,
                category,
                age,
                note,
                last_check_time,
            })
    })
}

/// Strategy for generating ages the capped category rejects but the
/// others accept.
pub fn capped_only_age_strategy() -> impl Strategy<Value = i64> {
    i64::from(CAPPED_MAX_AGE + 1)..=i64::from(MAX_AGE)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
