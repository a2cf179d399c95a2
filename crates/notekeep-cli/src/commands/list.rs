use chrono::Local;
use notekeep_core::pagination::FetchOutcome;
use notekeep_core::{CategoryCache, CategoryId, PaginatedListFetcher};

use crate::commands::common::{
    connect, format_note_lines, note_to_list_item, GlobalOptions, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(
    category: Option<i64>,
    all: bool,
    as_json: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let (_, client) = connect(options).await?;
    let filter = category.map(CategoryId::new);

    let fetcher = PaginatedListFetcher::new(client.clone(), filter);
    fetcher.reset(filter).await?;
    if all {
        // Keep signalling that the last row is visible until the cursor runs out.
        while let Some(last) = fetcher.len().checked_sub(1) {
            match fetcher.notify_visible(last).await? {
                FetchOutcome::Appended(_) => {}
                _ => break,
            }
        }
    }
    let notes = fetcher.items();
    let now = Local::now();

    if as_json {
        let categories = CategoryCache::new(client);
        categories.list().await?;
        let items = notes
            .iter()
            .map(|note| {
                let color = note.category_id().map_or_else(
                    || notekeep_core::models::FALLBACK_CATEGORY_COLOR.to_string(),
                    |id| categories.color_of(id),
                );
                note_to_list_item(note, color, &now)
            })
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_note_lines(&notes, &now) {
            println!("{line}");
        }
        if !fetcher.is_exhausted() {
            println!("(more notes available, rerun with --all)");
        }
    }

    Ok(())
}
