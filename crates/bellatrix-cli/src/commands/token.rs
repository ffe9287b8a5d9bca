use anyhow::{Context, Result};
use bellatrix_core::DeclaredState;
use colored::Colorize;

use crate::auth;
use crate::cli::TokenArgs;
use crate::output::print_success;

pub async fn token(args: &TokenArgs) -> Result<()> {
    let mut state = DeclaredState::from_path(&args.input)
        .context("Failed to load the input state file")?;

    tracing::info!(username = %args.username, "Requesting access token");
    let token = auth::oauth_password(
        &args.login_url,
        &args.username,
        &args.password,
        &args.client_id,
        &args.scope,
    )
    .await?;

    auth::apply_bearer(&mut state, &token.access_token);
    auth::write_state(&args.output, &state)?;

    print_success(&format!(
        "Wrote state file with access token to {}",
        args.output.display().to_string().cyan()
    ));
    Ok(())
}
