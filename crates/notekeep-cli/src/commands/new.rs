use notekeep_core::models::NewNote;
use notekeep_core::{CategoryCache, CategoryId};

use crate::commands::common::{connect, GlobalOptions};
use crate::error::CliError;

pub async fn run_new(category: Option<i64>, options: &GlobalOptions) -> Result<(), CliError> {
    let (_, client) = connect(options).await?;

    let category_id = match category {
        Some(id) => CategoryId::new(id),
        None => {
            let categories = CategoryCache::new(client.clone());
            categories.list().await?;
            categories
                .default_category()
                .map(|category| category.id)
                .ok_or(CliError::NoCategories)?
        }
    };

    let note = client.create_note(NewNote { category_id }).await?;
    println!("{}", note.id);
    Ok(())
}
