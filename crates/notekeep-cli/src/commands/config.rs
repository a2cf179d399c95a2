use notekeep_core::config::default_config_path;
use notekeep_core::util::{is_http_url, normalize_text_option};
use notekeep_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::{load_config, GlobalOptions};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { api_base_url } => run_config_init(api_base_url),
        ConfigCommands::Show => {
            let config = load_config(options)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn run_config_init(api_base_url: String) -> Result<(), CliError> {
    let path = default_config_path()?;
    let mut config = ClientConfig::load_from_path(&path)?;
    config.api_base_url = Some(normalize_api_base_url(api_base_url)?);
    config.save_to_path(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn normalize_api_base_url(raw: String) -> Result<String, CliError> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        notekeep_core::Error::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if !is_http_url(&url) {
        return Err(notekeep_core::Error::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        )
        .into());
    }
    Ok(url.trim_end_matches('/').to_string())
}
