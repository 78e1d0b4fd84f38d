//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never prompt
//! - `--quiet` / `-q`: Minimal output

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::format::ExportFormat;
use crate::core::params::{DimensionPreset, GenerationFlag, Model};

/// pollen - generate, inspect, and keep AI-generated images
#[derive(Parser, Debug)]
#[command(name = "pollen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the default search
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompts may be shown.
    ///
    /// False under `--no-interactive` or `--quiet`, when the config turns
    /// prompts off, or when stdin is not a terminal.
    pub fn interactive(&self, config_allows: bool) -> bool {
        use std::io::IsTerminal;

        !self.no_interactive && !self.quiet && config_allows && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an image from a prompt
    #[command(
        long_about = "Generate an image from a text prompt.\n\n\
            The image is requested from the remote model with the given size, seed, \
            model, and flags. Any metadata the model embeds in the returned image is \
            decoded and shown. Unset options fall back to the [generator] section of \
            the config file.\n\n\
            With --from or --params the generation starts from an earlier parameter \
            set instead; options given on the command line override it.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Generate with defaults and keep the result
    pollen generate \"a lighthouse at dusk\" --save

    # Reproduce an earlier image exactly
    pollen generate \"a lighthouse at dusk\" --seed 421337 --model turbo

    # Same parameters as a saved image, new seed
    pollen generate --from 3f2a --seed random

    # Parameters from a file written by 'pollen params'
    pollen params 3f2a > fox.json && pollen generate --params fox.json --safe

    # Square image without the logo, written to ./out and opened
    pollen generate \"a red fox\" --preset square --nologo --out out --open"
    )]
    Generate(GenerateArgs),

    /// List saved images
    #[command(long_about = "List saved images, newest first.\n\n\
        Each line shows the short id, creation time, model, size, and prompt. \
        With --quiet only full ids are printed.")]
    List,

    /// Show a saved image's parameters and embedded metadata
    Show {
        /// Image id or unique id prefix
        id: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a saved image's generation parameters as JSON
    Params {
        /// Image id or unique id prefix
        id: String,
    },

    /// Write a saved image to a file
    Export {
        /// Image id or unique id prefix
        id: String,

        /// Directory to write into (default: current directory)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Convert to this format (default: as generated)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Open the exported file in the system viewer
        #[arg(long)]
        open: bool,
    },

    /// Delete a saved image
    Delete {
        /// Image id or unique id prefix
        id: String,

        /// Do not ask for confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Decode the metadata embedded in any image file
    #[command(after_help = "\
EXAMPLES:
    pollen inspect ~/Downloads/image.jpg
    pollen inspect image.jpg --json | jq .seed")]
    Inspect {
        /// Image file to read
        file: PathBuf,

        /// Print the metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store the API token used for generation requests
    #[command(long_about = "Store the API token used for generation requests.\n\n\
        The token is kept in the secret store and sent as a bearer token. \
        $POLLINATIONS_API_TOKEN takes precedence when set. The token is never printed.")]
    Auth {
        /// Token value (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Show whether a token is configured
        #[arg(long, conflicts_with_all = ["token", "logout"])]
        status: bool,

        /// Remove the stored token
        #[arg(long, conflicts_with = "token")]
        logout: bool,
    },

    /// Get, set, or list configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
EXAMPLES:
    # Bash
    pollen completion bash > ~/.local/share/bash-completion/completions/pollen

    # Zsh
    pollen completion zsh > ~/.zfunc/_pollen

    # Fish
    pollen completion fish > ~/.config/fish/completions/pollen.fish

    # PowerShell
    pollen completion powershell | Out-String | Invoke-Expression")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments of `pollen generate`.
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("export_target").args(["out", "open"]).multiple(true)))]
pub struct GenerateArgs {
    /// Text prompt (optional with --from or --params)
    #[arg(required_unless_present_any = ["from", "params"])]
    pub prompt: Option<String>,

    /// Start from a saved image's parameters
    #[arg(long, value_name = "ID", conflicts_with = "params")]
    pub from: Option<String>,

    /// Start from a parameter file written by 'pollen params' ('-' for stdin)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, conflicts_with = "preset")]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long, conflicts_with = "preset")]
    pub height: Option<u32>,

    /// Named size
    #[arg(long, value_enum)]
    pub preset: Option<DimensionPreset>,

    /// Seed; random when not an integer
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<String>,

    /// Model to use
    #[arg(long, value_enum)]
    pub model: Option<Model>,

    /// Ask the service not to add its logo
    #[arg(long)]
    pub nologo: bool,

    /// Keep the image out of the public feed
    #[arg(long)]
    pub private: bool,

    /// Let the service rewrite the prompt
    #[arg(long)]
    pub enhance: bool,

    /// Enable the service's content filter
    #[arg(long)]
    pub safe: bool,

    /// Save the result
    #[arg(long)]
    pub save: bool,

    /// Export the result into this directory
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Export the result (to --out or the current directory) and open it
    #[arg(long)]
    pub open: bool,

    /// Convert the exported file to this format
    #[arg(long, value_enum, requires = "export_target")]
    pub format: Option<ExportFormat>,
}

impl GenerateArgs {
    /// Flags given on the command line.
    pub fn flags(&self) -> Vec<GenerationFlag> {
        [
            (self.nologo, GenerationFlag::NoLogo),
            (self.private, GenerationFlag::Private),
            (self.enhance, GenerationFlag::Enhance),
            (self.safe, GenerationFlag::Safe),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect()
    }
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
