//! inspect command - Decode the metadata embedded in an image file

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::codec;
use crate::ui::output;

/// Print the metadata embedded in `file`.
///
/// A file without metadata is not an error: `--json` prints `null`,
/// otherwise a short notice is shown.
pub fn inspect(ctx: &Context, file: &Path, json: bool) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let metadata = match codec::try_decode(&bytes) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            output::debug(format!("{}: {}", file.display(), e), ctx.verbosity);
            None
        }
    };

    if json {
        let text = serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
        println!("{}", text);
        return Ok(());
    }

    match metadata {
        Some(metadata) if metadata.is_empty() => {
            output::print("Embedded metadata is empty.", ctx.verbosity)
        }
        Some(metadata) => println!("{}", output::format_metadata(&metadata)),
        None => output::print(
            format!("No embedded metadata in {}.", file.display()),
            ctx.verbosity,
        ),
    }
    Ok(())
}
