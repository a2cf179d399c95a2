//! Category model

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Colors offered when creating a category.
pub const CATEGORY_PALETTE: [&str; 6] = [
    "#EF9C66", "#FCDC94", "#C8CFA0", "#78ABA8", "#FF9E9E", "#C0ACD0",
];

/// Color reported for categories missing from the cache.
pub const FALLBACK_CATEGORY_COLOR: &str = "gray";

const MAX_CATEGORY_NAME_LEN: usize = 100;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("Invalid regex")
});

/// Server-assigned category identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A category as returned by `/api/v1/categories/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: String,
    /// Server-side aggregate; stale after notes are created or deleted.
    #[serde(default)]
    pub note_count: u64,
}

/// Request body for creating a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

impl NewCategory {
    /// Validate and normalize a category before it is posted.
    ///
    /// Names are trimmed and must not be blank; colors must be `#RGB` or
    /// `#RRGGBB`.
    pub fn new(name: impl AsRef<str>, color: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(Error::field("name", "Name cannot be empty or whitespace"));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(Error::field(
                "name",
                format!("Name must be at most {MAX_CATEGORY_NAME_LEN} characters"),
            ));
        }

        let color = color.as_ref().trim();
        if !is_hex_color(color) {
            return Err(Error::field(
                "color",
                format!("{color} is not a valid HEX color code"),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            color: color.to_string(),
        })
    }
}

/// Whether `value` is a `#RGB` or `#RRGGBB` color.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_category_trims_name() {
        let category = NewCategory::new("  Work ", "#C8CFA0").unwrap();
        assert_eq!(category.name, "Work");
        assert_eq!(category.color, "#C8CFA0");
    }

    #[test]
    fn new_category_rejects_blank_name() {
        let error = NewCategory::new("   ", "#C8CFA0").unwrap_err();
        assert!(error.field_errors().unwrap().contains_key("name"));
    }

    #[test]
    fn new_category_rejects_bad_color() {
        let error = NewCategory::new("Work", "C8CFA0").unwrap_err();
        assert!(error.field_errors().unwrap().contains_key("color"));
        assert!(NewCategory::new("Work", "#abc").is_ok());
        assert!(NewCategory::new("Work", "#abcd").is_err());
    }

    #[test]
    fn palette_colors_are_valid() {
        assert!(CATEGORY_PALETTE.iter().all(|color| is_hex_color(color)));
    }

    #[test]
    fn category_deserializes_server_payload() {
        let payload = r##"{"id": 4, "user": null, "name": "Random Thoughts", "color": "#EF9C66", "note_count": 7}"##;
        let category: Category = serde_json::from_str(payload).unwrap();
        assert_eq!(category.id, CategoryId::new(4));
        assert_eq!(category.note_count, 7);
    }
}
