//! delete command - Remove a saved image

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::ui::prompts;

/// Delete a saved image.
///
/// Asks for confirmation when interactive, unless `force` is set.
pub fn delete(ctx: &Context, id: &str, force: bool) -> Result<()> {
    let session = ctx.open_library()?;
    let result = ctx.find_record(&session, id).and_then(|record| {
        if !force && ctx.interactive {
            let question = format!(
                "Delete {} \"{}\"?",
                record.id.short(),
                crate::ui::output::truncate(&record.params.prompt, 40)
            );
            if !prompts::confirm(&question, false, true)? {
                bail!("Aborted.");
            }
        }
        session
            .delete(&record.id)
            .context("Failed to delete image")?;
        Ok(record.id)
    });
    ctx.close_session(session);
    let deleted = result?;

    if !ctx.quiet() {
        println!("Deleted {}.", deleted.short());
    }
    Ok(())
}
