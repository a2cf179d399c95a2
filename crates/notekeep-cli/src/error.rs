use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notekeep_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `notekeep auth login` first.")]
    NotSignedIn,
    #[error("Session is no longer valid: {0}. Run `notekeep auth login` again.")]
    SessionInvalid(String),
    #[error("No categories exist yet. Create one with `notekeep categories create`.")]
    NoCategories,
    #[error("Conflict detected. Please reload the note (rerun with --force to overwrite).")]
    Conflict,
    #[error("Failed to save note: {0}")]
    SaveFailed(String),
    #[error("Edited note cannot be empty")]
    EmptyEditedNote,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
}
