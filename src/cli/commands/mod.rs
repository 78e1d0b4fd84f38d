//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Opens a session (or a secret store) and calls into it
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `generate` involves network I/O. [`block_on`] runs it on a
//! current-thread tokio runtime built for the one command.

mod auth;
mod completion;
mod config_cmd;
mod delete;
mod export;
mod generate;
mod inspect;
mod list;
mod show;

// Re-export command functions for testing and direct invocation
pub use auth::auth;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use delete::delete;
pub use export::export;
pub use generate::generate;
pub use inspect::inspect;
pub use list::list;
pub use show::{params, show};

use std::future::Future;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Generate(args) => generate::generate(ctx, &args),
        Command::List => list::list(ctx),
        Command::Show { id, json } => show::show(ctx, &id, json),
        Command::Params { id } => show::params(ctx, &id),
        Command::Export {
            id,
            out,
            format,
            open,
        } => export::export(ctx, &id, out.as_deref(), format, open),
        Command::Delete { id, force } => delete::delete(ctx, &id, force),
        Command::Inspect { file, json } => inspect::inspect(ctx, &file, json),
        Command::Auth {
            token,
            status,
            logout,
        } => auth::auth(ctx, token.as_deref(), status, logout),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Run a future to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// Open `path` in the system viewer.
pub(crate) fn open_in_viewer(ctx: &Context, path: &std::path::Path) {
    if let Err(e) = open::that(path) {
        crate::ui::output::warn(
            format!("could not open {}: {}", path.display(), e),
            ctx.verbosity,
        );
    }
}
