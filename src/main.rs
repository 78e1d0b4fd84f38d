//! pollen binary entry point.

use std::process::ExitCode;

use pollen::cli::{self, Cli};
use pollen::ui::output;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "pollen=debug" } else { "pollen=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
