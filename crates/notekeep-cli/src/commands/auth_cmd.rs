use notekeep_core::{SessionStatus, Token};

use crate::cli::AuthCommands;
use crate::commands::common::{build_client, GlobalOptions};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let (_, client) = build_client(options)?;
    let session = client.session();

    let status = match command {
        AuthCommands::Login { username, password } => {
            session.sign_in(&username, &password).await?
        }
        AuthCommands::Register { email, password } => session.register(&email, &password).await?,
        AuthCommands::Token { token } => session.login(Token::new(token)?).await?,
        AuthCommands::Status => session.restore().await?,
        AuthCommands::Logout => {
            session.logout()?;
            println!("Signed out");
            return Ok(());
        }
    };

    let snapshot = session.snapshot();
    match status {
        SessionStatus::Authenticated => {
            let label = snapshot
                .identity
                .map_or_else(|| "(unknown user)".to_string(), |user| user.display_name());
            println!("Signed in as {label}");
            Ok(())
        }
        SessionStatus::Invalid => Err(CliError::SessionInvalid(
            snapshot.error.unwrap_or_else(|| "unknown error".to_string()),
        )),
        SessionStatus::Unauthenticated | SessionStatus::Loading => {
            println!("Not signed in");
            Ok(())
        }
    }
}
