use notekeep_core::models::CATEGORY_PALETTE;
use notekeep_core::CategoryCache;

use crate::cli::CategoryCommands;
use crate::commands::common::{connect, GlobalOptions};
use crate::error::CliError;

pub async fn run_categories(
    command: CategoryCommands,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let (_, client) = connect(options).await?;
    let cache = CategoryCache::new(client);

    match command {
        CategoryCommands::List { json } => {
            let categories = cache.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for category in &categories {
                    println!(
                        "{:<6}  {:<8}  {} ({})",
                        category.id.get(),
                        category.color,
                        category.name,
                        note_count_label(category.note_count)
                    );
                }
            }
        }
        CategoryCommands::Create { name, color } => {
            let color = match color {
                Some(color) => color,
                None => palette_color(cache.list().await?.len()).to_string(),
            };
            let id = cache.create(&name, &color).await?;
            println!("{id}");
        }
    }

    Ok(())
}

/// Cycle through the palette so consecutive categories get distinct colors.
pub const fn palette_color(existing: usize) -> &'static str {
    CATEGORY_PALETTE[existing % CATEGORY_PALETTE.len()]
}

pub fn note_count_label(count: u64) -> String {
    if count == 1 {
        "1 note".to_string()
    } else {
        format!("{count} notes")
    }
}
