//! The closed set of record categories.

use crate::error::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Highest age allowed for any category.
pub const MAX_AGE: u32 = 45;

/// Highest age allowed for the capped category.
pub const CAPPED_MAX_AGE: u32 = 22;

/// A record category.
///
/// [`Category::as_str`] is the one canonical rendering. Serialization,
/// filtering and the uniqueness check all go through it; `Display`
/// delegates to it as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Capuchin.
    Capuchin,
    /// Macaque.
    Macaque,
    /// Marmoset. Age is capped at [`CAPPED_MAX_AGE`].
    Marmoset,
    /// Howler.
    Howler,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 4] = [
        Category::Capuchin,
        Category::Macaque,
        Category::Marmoset,
        Category::Howler,
    ];

    /// The category whose age is capped.
    pub const CAPPED: Category = Category::Marmoset;

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Capuchin => "capuchin",
            Category::Macaque => "macaque",
            Category::Marmoset => "marmoset",
            Category::Howler => "howler",
        }
    }

    /// Returns the highest allowed age for this category.
    #[must_use]
    pub const fn max_age(self) -> u32 {
        match self {
            Category::Marmoset => CAPPED_MAX_AGE,
            _ => MAX_AGE,
        }
    }

    /// Parses a category, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCategory`] for anything outside
    /// the fixed set.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let folded = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == folded)
            .ok_or_else(|| ValidationError::InvalidCategory {
                value: value.to_string(),
            })
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Category::parse("Marmoset").unwrap(), Category::Marmoset);
        assert_eq!(Category::parse(" HOWLER ").unwrap(), Category::Howler);
        assert_eq!("macaque".parse::<Category>().unwrap(), Category::Macaque);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = Category::parse("gorilla").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidCategory {
                value: "gorilla".into()
            }
        );
        assert!(Category::parse("").is_err());
    }

    #[test]
    fn display_is_canonical() {
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.as_str());
            assert_eq!(category.as_str(), category.as_str().to_lowercase());
        }
        assert_eq!(format!("{}", Category::Marmoset), "marmoset");
    }

    #[test]
    fn only_capped_category_has_lower_limit() {
        assert_eq!(Category::CAPPED.max_age(), CAPPED_MAX_AGE);
        for category in Category::ALL {
            if category != Category::CAPPED {
                assert_eq!(category.max_age(), MAX_AGE);
            }
        }
    }
}
