//! export command - Write a saved image to disk

use std::path::Path;

use anyhow::{Context as _, Result};

use super::open_in_viewer;
use crate::cli::Context;
use crate::core::format::ExportFormat;
use crate::core::types::ResourceKey;
use crate::ui::output;

/// Export a saved image into `out` (default: the current directory),
/// converted to `format` when one is given.
pub fn export(
    ctx: &Context,
    id: &str,
    out: Option<&Path>,
    format: Option<ExportFormat>,
    open: bool,
) -> Result<()> {
    let session = ctx.open_library()?;
    let result = ctx.find_record(&session, id).and_then(|record| {
        let dir = out.unwrap_or(Path::new("."));
        session
            .export(&ResourceKey::Record(record.id), dir, format)
            .context("Failed to export image")
    });
    ctx.close_session(session);
    let path = result?;

    if ctx.quiet() {
        println!("{}", path.display());
    } else {
        output::print(format!("Exported to {}", path.display()), ctx.verbosity);
    }
    if open {
        open_in_viewer(ctx, &path);
    }
    Ok(())
}
