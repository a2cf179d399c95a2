use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use notekeep_core::auth::FileTokenStore;
use notekeep_core::util::format_relative_day;
use notekeep_core::{ApiClient, ClientConfig, Note, SessionStatus, TokenStore};
use serde::Serialize;

use crate::error::CliError;
use crate::token_store::KeyringTokenStore;

const PREVIEW_CHARS: usize = 40;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub api_url: Option<String>,
    pub token_file: Option<PathBuf>,
}

pub fn load_config(options: &GlobalOptions) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load()?;
    config.apply_env_overrides(options.api_url.clone());
    Ok(config)
}

pub fn token_store(
    config: &ClientConfig,
    options: &GlobalOptions,
) -> Result<Arc<dyn TokenStore>, CliError> {
    let store: Arc<dyn TokenStore> = match &options.token_file {
        Some(path) => Arc::new(FileTokenStore::new(path)),
        None => Arc::new(KeyringTokenStore::new(&config.require_api_base_url()?)),
    };
    Ok(store)
}

/// Build a client without touching the session.
pub fn build_client(options: &GlobalOptions) -> Result<(ClientConfig, ApiClient), CliError> {
    let config = load_config(options)?;
    let store = token_store(&config, options)?;
    let client = ApiClient::from_config(&config, store)?;
    Ok((config, client))
}

/// Build a client and require a valid session.
pub async fn connect(options: &GlobalOptions) -> Result<(ClientConfig, ApiClient), CliError> {
    let (config, client) = build_client(options)?;
    match client.session().restore().await? {
        SessionStatus::Authenticated => Ok((config, client)),
        SessionStatus::Invalid => Err(CliError::SessionInvalid(
            client
                .session()
                .snapshot()
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        SessionStatus::Unauthenticated | SessionStatus::Loading => Err(CliError::NotSignedIn),
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub category: Option<String>,
    pub color: String,
    pub last_edited: String,
    pub updated_at: String,
}

pub fn note_to_list_item(note: &Note, color: String, now: &DateTime<Local>) -> NoteListItem {
    NoteListItem {
        id: note.id.get(),
        title: note.title.clone(),
        preview: note.preview(80),
        category: note.category.as_ref().map(|category| category.name.clone()),
        color,
        last_edited: last_edited_label(note, now),
        updated_at: note.version.to_string(),
    }
}

pub fn format_note_lines(notes: &[Note], now: &DateTime<Local>) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let mut preview = note.preview(PREVIEW_CHARS);
            if preview.is_empty() {
                preview = "(untitled)".to_string();
            }
            let day = last_edited_label(note, now);
            match &note.category {
                Some(category) => format!("{id:<6}  {preview:<40}  {day:<10}  {}", category.name),
                None => format!("{id:<6}  {preview:<40}  {day}"),
            }
        })
        .collect()
}

fn last_edited_label(note: &Note, now: &DateTime<Local>) -> String {
    note.last_edited_at().map_or_else(
        || "-".to_string(),
        |when| format_relative_day(&when.with_timezone(&Local), now),
    )
}

/// Render a note for `$EDITOR`: the title on the first line, a blank line,
/// then the content.
pub fn render_editor_document(title: &str, content: &str) -> String {
    format!("{title}\n\n{content}")
}

/// Inverse of [`render_editor_document`].
pub fn parse_editor_document(document: &str) -> Option<(String, String)> {
    if document.trim().is_empty() {
        return None;
    }
    let (title, rest) = document.split_once('\n').unwrap_or((document, ""));
    let content = rest.strip_prefix('\n').unwrap_or(rest);
    Some((title.trim().to_string(), content.trim_end().to_string()))
}

pub fn capture_editor_input_with_initial(initial: &str) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let edited = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(Some(edited).filter(|text| !text.trim().is_empty()))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // EDITOR may carry arguments, e.g. `code --wait`.
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notekeep-{}-{nanos}.md", std::process::id()))
}
