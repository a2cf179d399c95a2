//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::{Category, CategoryId};

/// Server-assigned note identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Optimistic-concurrency stamp for a note.
///
/// This is the server's `updated_at` value, echoed back verbatim on update.
/// It is only ever taken from a server response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteVersion(String);

impl NoteVersion {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the stamp as a timestamp, if the server sent RFC 3339.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }
}

impl fmt::Display for NoteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
impl From<&str> for NoteVersion {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A note as returned by `/api/v1/notes/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updated_at")]
    pub version: NoteVersion,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl Note {
    #[must_use]
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_ref().map(|category| category.id)
    }

    #[must_use]
    pub fn last_edited_at(&self) -> Option<DateTime<Utc>> {
        self.version.timestamp()
    }

    /// First `max_len` characters of the title, or of the content when the
    /// title is blank.
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        let source = if self.title.trim().is_empty() {
            self.content.lines().next().unwrap_or("")
        } else {
            self.title.as_str()
        };
        source.trim().chars().take(max_len).collect()
    }
}

/// A partial edit coming from the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl NoteEdit {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category_id.is_none()
    }
}

/// Locally edited fields of the open note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteBuffer {
    pub title: String,
    pub content: String,
    pub category_id: Option<CategoryId>,
}

impl NoteBuffer {
    /// Apply an edit, returning whether any field changed.
    pub fn apply(&mut self, edit: NoteEdit) -> bool {
        let mut changed = false;
        if let Some(title) = edit.title {
            changed |= title != self.title;
            self.title = title;
        }
        if let Some(content) = edit.content {
            changed |= content != self.content;
            self.content = content;
        }
        if let Some(category_id) = edit.category_id {
            changed |= Some(category_id) != self.category_id;
            self.category_id = Some(category_id);
        }
        changed
    }

    /// PATCH body for this buffer stamped with `version`.
    #[must_use]
    pub fn to_update(&self, version: NoteVersion) -> NoteUpdate {
        NoteUpdate {
            title: self.title.clone(),
            content: self.content.clone(),
            category_id: self.category_id,
            updated_at: version,
        }
    }
}

impl From<&Note> for NoteBuffer {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            category_id: note.category_id(),
        }
    }
}

/// PATCH body for `/api/v1/notes/{id}/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub updated_at: NoteVersion,
}

/// POST body for `/api/v1/notes/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub category_id: CategoryId,
}
