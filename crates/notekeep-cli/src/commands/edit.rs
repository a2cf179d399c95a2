use notekeep_core::models::NoteEdit;
use notekeep_core::util::format_last_edited;
use notekeep_core::{CategoryId, NoteId, NoteSyncEngine, SyncSettings, SyncState};

use crate::commands::common::{
    capture_editor_input_with_initial, connect, parse_editor_document, render_editor_document,
    GlobalOptions,
};
use crate::error::CliError;

pub struct EditArgs {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<i64>,
    pub force: bool,
}

pub async fn run_edit(args: EditArgs, options: &GlobalOptions) -> Result<(), CliError> {
    let (config, client) = connect(options).await?;
    let engine = NoteSyncEngine::new(client, SyncSettings::from_config(&config));
    let result = edit_with_engine(&engine, args).await;
    engine.shutdown().await;
    result
}

async fn edit_with_engine(
    engine: &NoteSyncEngine<notekeep_core::ApiClient>,
    args: EditArgs,
) -> Result<(), CliError> {
    let id = NoteId::new(args.id);
    engine.load(id).await?;

    let edit = if args.title.is_none() && args.content.is_none() && args.category.is_none() {
        let buffer = engine.snapshot().buffer;
        let initial = render_editor_document(&buffer.title, &buffer.content);
        let edited = capture_editor_input_with_initial(&initial)?
            .as_deref()
            .and_then(parse_editor_document)
            .ok_or(CliError::EmptyEditedNote)?;
        NoteEdit {
            title: Some(edited.0),
            content: Some(edited.1),
            category_id: None,
        }
    } else {
        NoteEdit {
            title: args.title,
            content: args.content,
            category_id: args.category.map(CategoryId::new),
        }
    };

    if engine.edit(edit) == SyncState::Idle {
        println!("{id} unchanged");
        return Ok(());
    }

    let mut snapshot = engine.flush().await;
    if snapshot.state == SyncState::Conflict && args.force {
        tracing::info!(note_id = %id, "Overwriting server copy after conflict");
        engine.reload_and_retry().await?;
        snapshot = engine.settled().await;
    }

    match snapshot.state {
        SyncState::Conflict => Err(CliError::Conflict),
        SyncState::Failed => Err(CliError::SaveFailed(
            snapshot.last_error.unwrap_or_else(|| "unknown error".to_string()),
        )),
        _ => {
            let edited = snapshot
                .last_edited_at
                .map(|when| format!(" (last edited {})", format_last_edited(&when)))
                .unwrap_or_default();
            println!("{id}{edited}");
            Ok(())
        }
    }
}
