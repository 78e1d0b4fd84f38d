//! generate command - Request an image and optionally keep it

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use super::{block_on, open_in_viewer};
use crate::cli::args::GenerateArgs;
use crate::cli::Context;
use crate::core::params::{resolve_seed, GenerationParams};
use crate::core::types::ResourceKey;
use crate::secrets;
use crate::session::{GenerateOutcome, Session};
use crate::ui::output;

/// Generate an image.
pub fn generate(ctx: &Context, args: &GenerateArgs) -> Result<()> {
    let imported = imported_params(ctx, args)?;
    let params = build_params(ctx, args, imported);
    params.validate().context("Invalid generation parameters")?;

    let token = resolve_token(ctx)?;
    let session = ctx.open_session(token)?;
    let result = run(ctx, &session, params, args);
    ctx.close_session(session);
    result
}

fn run(ctx: &Context, session: &Session, params: GenerationParams, args: &GenerateArgs) -> Result<()> {
    output::debug(
        format!(
            "requesting {}x{} from {} (seed {})",
            params.width, params.height, params.model, params.seed
        ),
        ctx.verbosity,
    );

    let image = match block_on(session.generate(params))?? {
        GenerateOutcome::Installed(image) => image,
        GenerateOutcome::Superseded { token } => {
            bail!("Request {} was superseded by a newer one", token)
        }
    };
    output::print(output::format_record(&image.record), ctx.verbosity);

    if args.save {
        let id = session.save_current().context("Failed to save image")?;
        if ctx.quiet() {
            println!("{}", id);
        } else {
            println!("Saved as {}", id.short());
        }
    }

    if args.out.is_some() || args.open {
        let dir = args.out.as_deref().unwrap_or(Path::new("."));
        let path = session
            .export(&ResourceKey::Current, dir, args.format)
            .context("Failed to export image")?;
        output::print(format!("Exported to {}", path.display()), ctx.verbosity);
        if args.open {
            open_in_viewer(ctx, &path);
        }
    }

    Ok(())
}

/// Parameters named by `--from` or `--params`, if either was given.
fn imported_params(ctx: &Context, args: &GenerateArgs) -> Result<Option<GenerationParams>> {
    if let Some(id) = &args.from {
        let session = ctx.open_library()?;
        let record = ctx.find_record(&session, id);
        ctx.close_session(session);
        let record = record?;
        output::debug(
            format!("starting from the parameters of {}", record.id.short()),
            ctx.verbosity,
        );
        return Ok(Some(record.params));
    }

    let Some(source) = &args.params else {
        return Ok(None);
    };
    let text = if source.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read parameters from stdin")?
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source.display()))?
    };
    let params = parse_params(&text)
        .with_context(|| format!("Invalid parameter file {}", source.display()))?;
    Ok(Some(params))
}

fn parse_params(text: &str) -> serde_json::Result<GenerationParams> {
    serde_json::from_str(text)
}

/// Combine command-line arguments with a starting parameter set.
///
/// Without an imported set, configured defaults fill whatever the command
/// line leaves open. An imported set is taken as is, seed included, and
/// only the options given on the command line change it. The prompt is
/// kept exactly as typed.
fn build_params(
    ctx: &Context,
    args: &GenerateArgs,
    imported: Option<GenerationParams>,
) -> GenerationParams {
    let config = &ctx.config;
    let mut params = match imported {
        Some(params) => params,
        None => {
            let mut params = GenerationParams::new(String::new())
                .with_model(config.model())
                .with_size(config.width(), config.height());
            for flag in config.default_flags() {
                params = params.with_flag(flag);
            }
            params
        }
    };

    if let Some(prompt) = &args.prompt {
        params.prompt = prompt.clone();
    }
    if let Some(seed) = &args.seed {
        params.seed = resolve_seed(Some(seed));
    }
    if let Some(model) = args.model {
        params.model = model;
    }
    match args.preset {
        Some(preset) => params = params.with_preset(preset),
        None => {
            params.width = args.width.unwrap_or(params.width);
            params.height = args.height.unwrap_or(params.height);
        }
    }
    for flag in args.flags() {
        params = params.with_flag(flag);
    }
    params
}

fn resolve_token(ctx: &Context) -> Result<Option<String>> {
    let store = secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")?;
    let resolved = secrets::resolve_token(store.as_ref()).context("Failed to read API token")?;
    Ok(resolved.map(|(token, source)| {
        output::debug(format!("using API token from {}", source), ctx.verbosity);
        token
    }))
}
