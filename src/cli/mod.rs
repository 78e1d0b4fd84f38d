//! cli
//!
//! Command-line interface layer for pollen.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and build the session
//! - Delegate to command handlers and format their output
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers build a [`Session`] and call its
//! operations; every handle the session creates is released when the
//! handler closes it. `generate` opens one with [`Context::open_session`],
//! which writes images to the cache directory so a viewer can open them.
//! Commands that only read the library use [`Context::open_library`],
//! which keeps payloads in memory. Network-bound commands run on a
//! current-thread tokio runtime.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::record::GeneratedImageRecord;
use crate::generator::PollinationsGenerator;
use crate::session::{FileAllocator, HandleAllocator, MemoryAllocator, ReleaseReport, Session};
use crate::store::FileRecordStore;
use crate::ui::output::{self, Verbosity};

/// Everything a command handler needs from the environment.
#[derive(Debug)]
pub struct Context {
    /// Output verbosity
    pub verbosity: Verbosity,
    /// Whether prompts may be shown
    pub interactive: bool,
    /// Loaded configuration
    pub config: Config,
}

impl Context {
    /// True in quiet mode.
    pub fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Open a session over the configured store and cache directory.
    ///
    /// `token` is sent with generation requests. Records the store could not
    /// load are reported as warnings.
    pub fn open_session(&self, token: Option<String>) -> Result<Session> {
        let cache_dir = self.config.cache_dir()?;
        let allocator = FileAllocator::new(&cache_dir)
            .with_context(|| format!("Failed to prepare cache directory {}", cache_dir.display()))?;
        self.open_with(allocator, token)
    }

    /// Open a session for commands that never display an image.
    ///
    /// Saved payloads stay in memory; nothing is written to the cache
    /// directory.
    pub fn open_library(&self) -> Result<Session> {
        self.open_with(MemoryAllocator::new(), None)
    }

    fn open_with(
        &self,
        allocator: impl HandleAllocator + 'static,
        token: Option<String>,
    ) -> Result<Session> {
        let records = self.config.records_path()?;
        let generator =
            PollinationsGenerator::new(self.config.api_base(), token, self.config.timeout())
                .context("Failed to set up the image service client")?;
        let store = FileRecordStore::new(records);

        let (session, report) = Session::open(allocator, generator, store);
        for skipped in &report.skipped {
            output::warn(format!("skipped saved image {}", skipped), self.verbosity);
        }
        if let Some(e) = &report.store_error {
            output::warn(
                format!("saved images unavailable: {}", e),
                self.verbosity,
            );
        }
        output::debug(
            format!("session opened with {} saved image(s)", report.loaded),
            self.verbosity,
        );
        Ok(session)
    }

    /// Close a session, warning about handles that failed to release.
    pub fn close_session(&self, session: Session) {
        let report: ReleaseReport = session.close();
        for failure in &report.failures {
            output::warn(
                format!("failed to release {}: {}", failure.handle, failure.error),
                self.verbosity,
            );
        }
    }

    /// Find a saved image by full id or unique id prefix.
    pub fn find_record(&self, session: &Session, id: &str) -> Result<GeneratedImageRecord> {
        session
            .find_by_prefix(id)
            .ok_or_else(|| anyhow::anyhow!("No saved image matches '{}'. Run 'pollen list'.", id))
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`, after logging is set
/// up from the same [`Cli`].
pub fn run(cli: Cli) -> Result<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);

    let loaded = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    for warning in &loaded.warnings {
        output::warn(&warning.message, verbosity);
    }
    if let Some(path) = loaded.config.loaded_from() {
        output::debug(format!("config loaded from {}", path.display()), verbosity);
    }

    let ctx = Context {
        verbosity,
        interactive: cli.interactive(loaded.config.interactive()),
        config: loaded.config,
    };

    commands::dispatch(cli.command, &ctx)
}
