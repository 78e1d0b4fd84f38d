//! list command - Show saved images, newest first

use anyhow::Result;

use crate::cli::Context;
use crate::ui::output;

/// List saved images.
///
/// In quiet mode only full ids are printed, one per line.
pub fn list(ctx: &Context) -> Result<()> {
    let session = ctx.open_library()?;
    let saved = session.saved();

    if ctx.quiet() {
        for record in &saved {
            println!("{}", record.id);
        }
    } else if saved.is_empty() {
        println!("No saved images. Use 'pollen generate --save' to keep one.");
    } else {
        for record in &saved {
            println!("{}", output::format_record_line(record));
        }
    }

    ctx.close_session(session);
    Ok(())
}
