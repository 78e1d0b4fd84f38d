//! show and params commands - Describe a saved image

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::ui::output;

/// Show a saved image's parameters and embedded metadata.
pub fn show(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let session = ctx.open_library()?;
    let record = ctx.find_record(&session, id);
    ctx.close_session(session);
    let record = record?;

    if json {
        let text = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;
        println!("{}", text);
    } else {
        println!("{}", output::format_record(&record));
    }
    Ok(())
}

/// Print a saved image's generation parameters as JSON.
///
/// The output is the exact parameter set, suitable for repeating the
/// generation.
pub fn params(ctx: &Context, id: &str) -> Result<()> {
    let session = ctx.open_library()?;
    let record = ctx.find_record(&session, id);
    ctx.close_session(session);
    let record = record?;

    let text =
        serde_json::to_string_pretty(&record.params).context("Failed to serialize parameters")?;
    println!("{}", text);
    Ok(())
}
