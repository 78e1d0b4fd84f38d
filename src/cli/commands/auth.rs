//! cli::commands::auth
//!
//! Store the image service API token.
//!
//! # Design
//!
//! - Tokens are stored through the configured `SecretStore`
//! - Tokens are NEVER printed to stdout/stderr
//! - Works both interactively (masked prompt) and with `--token`
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for token)
//! pollen auth
//!
//! # Non-interactive
//! pollen auth --token sk_xxxx
//!
//! # Check status
//! pollen auth --status
//!
//! # Remove stored token
//! pollen auth --logout
//! ```

use crate::cli::Context;
use crate::generator::pollinations::TOKEN_ENV_VAR;
use crate::secrets::{self, SecretStore, TOKEN_KEY};
use crate::ui::prompts;
use anyhow::{bail, Context as _, Result};

/// Run the auth command.
///
/// # Security
///
/// This function NEVER prints the token value. It only confirms success/failure.
pub fn auth(ctx: &Context, token: Option<&str>, status: bool, logout: bool) -> Result<()> {
    let store = secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")?;

    if status {
        return show_status(ctx, store.as_ref());
    }

    if logout {
        return do_logout(ctx, store.as_ref());
    }

    let token_value = get_token(ctx, token)?;
    validate_token(&token_value)?;

    store
        .set(TOKEN_KEY, &token_value)
        .context("Failed to store token")?;

    if !ctx.quiet() {
        println!("API token stored.");
    }
    Ok(())
}

/// Show authentication status.
fn show_status(ctx: &Context, store: &dyn SecretStore) -> Result<()> {
    let resolved = secrets::resolve_token(store).context("Failed to read API token")?;

    if ctx.quiet() {
        // Machine-readable output
        println!(
            "{}",
            if resolved.is_some() {
                "authenticated"
            } else {
                "not_authenticated"
            }
        );
    } else if let Some((_, source)) = resolved {
        // Only the source; never the token or any part of it
        println!("API token configured (from {}).", source);
    } else {
        println!("No API token configured; requests are anonymous.");
        println!("Run 'pollen auth' or set ${} to add one.", TOKEN_ENV_VAR);
    }
    Ok(())
}

/// Remove the stored token.
fn do_logout(ctx: &Context, store: &dyn SecretStore) -> Result<()> {
    let removed = store
        .delete(TOKEN_KEY)
        .context("Failed to remove stored token")?;

    if !ctx.quiet() {
        if removed {
            println!("Stored API token removed.");
        } else {
            println!("No stored API token.");
        }
        if std::env::var(TOKEN_ENV_VAR).is_ok_and(|v| !v.trim().is_empty()) {
            println!("Note: ${} is still set.", TOKEN_ENV_VAR);
        }
    }
    Ok(())
}

/// Get token from argument or interactive prompt.
fn get_token(ctx: &Context, token_arg: Option<&str>) -> Result<String> {
    if let Some(t) = token_arg {
        return Ok(t.trim().to_string());
    }

    if !ctx.interactive {
        bail!("Token required. Use --token <TOKEN> or run interactively.");
    }

    let token = prompts::password("API token", true).context("Failed to read token")?;
    Ok(token.trim().to_string())
}

/// Basic format checks; the token is not checked against the service.
fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }
    if token.len() < 8 {
        bail!("Token appears to be too short.");
    }
    if token.chars().any(char::is_whitespace) {
        bail!("Token should not contain whitespace.");
    }
    Ok(())
}
