//! Product categories and the category selector used by the filter.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Categories the storefront ships with. Other values are accepted as-is.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "tubers",
    "grains",
    "vegetables",
    "oils",
    "fruits",
    "legumes",
];

/// Category given to catalog records that carry none.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Selector value meaning "no category restriction".
const ALL: &str = "all";

/// Errors that can occur when parsing a [`Category`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// The input string is empty or whitespace.
    #[error("category cannot be empty")]
    Empty,
    /// The input is the reserved "all" selector.
    #[error("\"all\" is reserved for the unrestricted selector")]
    Reserved,
}

/// A product category.
///
/// Categories are trimmed and lowercased on parse so that `"Tubers"` from one
/// upstream revision and `"tubers"` from another compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Parse a category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::Empty` for blank input and
    /// `CategoryError::Reserved` for the `all` selector value.
    pub fn parse(s: &str) -> Result<Self, CategoryError> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(CategoryError::Empty);
        }
        if normalized == ALL {
            return Err(CategoryError::Reserved);
        }
        Ok(Self(normalized))
    }

    /// The category for products listed without one.
    #[must_use]
    pub fn uncategorized() -> Self {
        Self(UNCATEGORIZED.to_string())
    }

    /// Returns the category as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of [`KNOWN_CATEGORIES`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.0.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Category selector for the catalog filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    /// No restriction.
    #[default]
    All,
    /// Only products in this category.
    Only(Category),
}

impl CategoryFilter {
    /// Parse a selector. Blank input and `all` (any case) mean no restriction.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Category::parse(s).map_or(Self::All, Self::Only)
    }

    /// Whether a product in `category` passes this selector.
    #[must_use]
    pub fn admits(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(selected) => selected == category,
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        match filter {
            CategoryFilter::All => ALL.to_string(),
            CategoryFilter::Only(category) => category.into(),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(category) => category.fmt(f),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let category = Category::parse("  Tubers ").unwrap();
        assert_eq!(category.as_str(), "tubers");
        assert!(category.is_known());
    }

    #[test]
    fn test_parse_accepts_unknown() {
        let category = Category::parse("snacks").unwrap();
        assert!(!category.is_known());
    }

    #[test]
    fn test_parse_rejects_blank_and_reserved() {
        assert_eq!(Category::parse(" "), Err(CategoryError::Empty));
        assert_eq!(Category::parse("ALL"), Err(CategoryError::Reserved));
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("All"), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("grains"),
            CategoryFilter::Only(Category::parse("grains").unwrap())
        );
    }

    #[test]
    fn test_uncategorized() {
        let category = Category::uncategorized();
        assert_eq!(category, Category::parse("Uncategorized").unwrap());
        assert!(!category.is_known());
        assert!(CategoryFilter::All.admits(&category));
    }

    #[test]
    fn test_filter_admits() {
        let tubers = Category::parse("tubers").unwrap();
        let grains = Category::parse("grains").unwrap();
        assert!(CategoryFilter::All.admits(&tubers));
        assert!(CategoryFilter::Only(tubers.clone()).admits(&tubers));
        assert!(!CategoryFilter::Only(tubers).admits(&grains));
    }

    #[test]
    fn test_filter_serde() {
        let filter: CategoryFilter = serde_json::from_str("\"Oils\"").unwrap();
        assert_eq!(filter.to_string(), "oils");
        assert_eq!(serde_json::to_string(&CategoryFilter::All).unwrap(), "\"all\"");
    }
}
