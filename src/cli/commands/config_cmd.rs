//! config command - Get, set, or list configuration values

use crate::cli::Context;
use crate::core::config::Config;
use anyhow::{Context as _, Result};

/// Print the effective value of `key`, defaults applied.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = ctx.config.effective(key)?;
    println!("{}", value);
    Ok(())
}

/// Set `key` and write the config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = ctx.config.clone();
    config.set(key, value)?;
    let path = config.save().context("Failed to write config")?;

    if !ctx.quiet() {
        println!("Set {} = {} in {}", key, value, path.display());
    }
    Ok(())
}

/// List every key with its effective value; unset keys are marked.
pub fn list(ctx: &Context) -> Result<()> {
    if !ctx.quiet() {
        match ctx.config.loaded_from() {
            Some(path) => println!("# Configuration ({})", path.display()),
            None => println!("# Configuration (defaults)"),
        }
    }

    for line in list_lines(&ctx.config)? {
        println!("{}", line);
    }
    Ok(())
}

fn list_lines(config: &Config) -> Result<Vec<String>> {
    Config::KEYS
        .iter()
        .map(|key| {
            let value = config.effective(key)?;
            let marker = if config.get(key)?.is_none() {
                "  (default)"
            } else {
                ""
            };
            Ok(format!("{} = {}{}", key, value, marker))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GeneratorConfig, PollenConfig};

    #[test]
    fn list_marks_defaults() {
        let config = Config::from_global(PollenConfig {
            generator: Some(GeneratorConfig {
                width: Some(800),
                ..Default::default()
            }),
            ..Default::default()
        });

        let lines = list_lines(&config).expect("list");
        assert_eq!(lines.len(), Config::KEYS.len());
        assert!(lines.contains(&"generator.width = 800".to_string()));
        assert!(lines.contains(&"generator.height = 1024  (default)".to_string()));
    }
}
