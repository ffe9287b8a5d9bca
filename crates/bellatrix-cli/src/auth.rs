use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bellatrix_core::DeclaredState;
use serde::Deserialize;

pub const DEFAULT_CLIENT_ID: &str = "api";
pub const DEFAULT_SCOPE: &str =
    "entity:read subscription:read subscription:delete subscription:write subscription:create";

const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Resource owner password grant against `login_url`.
pub async fn oauth_password(
    login_url: &str,
    username: &str,
    password: &str,
    client_id: &str,
    scope: &str,
) -> Result<TokenResponse> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "password")
        .append_pair("username", username)
        .append_pair("password", password)
        .append_pair("client_id", client_id)
        .append_pair("scope", scope)
        .finish();

    let client = reqwest::Client::new();
    let resp = client
        .post(login_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .context("Failed to connect to the authentication server")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Token request failed (HTTP {status}): {body}");
    }

    resp.json().await.context("Failed to parse token response")
}

/// Set the bearer token as an additional header of every broker call.
pub fn apply_bearer(state: &mut DeclaredState, access_token: &str) {
    state
        .client_options
        .additional_headers
        .insert(AUTHORIZATION.to_string(), format!("Bearer {access_token}"));
}

pub fn write_state(path: &Path, state: &DeclaredState) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write state file {}", path.display()))?;
    Ok(())
}
