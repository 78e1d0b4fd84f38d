//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Warnings, errors, and
//! debug lines go to stderr so piped output stays clean.

use std::fmt::Display;

use crate::core::codec::EmbeddedMetadata;
use crate::core::record::GeneratedImageRecord;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. Quiet wins over debug.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Truncate `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// One line of `pollen list`.
pub fn format_record_line(record: &GeneratedImageRecord) -> String {
    format!(
        "{}  {}  {:<8}  {:>9}  {}",
        record.id.short(),
        record.created_at.as_datetime().format("%Y-%m-%d %H:%M"),
        record.params.model.as_str(),
        format!("{}x{}", record.params.width, record.params.height),
        truncate(&record.params.prompt, 50)
    )
}

/// Multi-line description of a record and its metadata.
pub fn format_record(record: &GeneratedImageRecord) -> String {
    let params = &record.params;
    let mut lines = vec![
        format!("id:       {}", record.id),
        format!("created:  {}", record.created_at),
        format!("prompt:   {}", params.prompt),
        format!("model:    {} ({})", params.model, params.model.label()),
        format!("size:     {}x{}", params.width, params.height),
        format!("seed:     {}", params.seed),
    ];
    if !params.flags.is_empty() {
        let flags: Vec<_> = params.flags.iter().map(|f| f.to_string()).collect();
        lines.push(format!("flags:    {}", flags.join(", ")));
    }
    match &record.metadata {
        Some(metadata) => {
            lines.push("metadata:".to_string());
            lines.push(format_metadata(metadata));
        }
        None => lines.push("metadata: (none)".to_string()),
    }
    lines.join("\n")
}

/// Metadata as indented `key: value` lines, in key order.
pub fn format_metadata(metadata: &EmbeddedMetadata) -> String {
    metadata
        .as_map()
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("  {}: {}", key, s),
            other => format!("  {}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{GenerationFlag, GenerationParams};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééé", 5), "ééééé");
    }

    #[test]
    fn record_line_has_short_id_and_size() {
        let record = GeneratedImageRecord::new(
            GenerationParams::new("a lighthouse").with_size(512, 512),
            None,
        );
        let line = format_record_line(&record);
        assert!(line.starts_with(&record.id.short()));
        assert!(line.contains("512x512"));
        assert!(line.contains("a lighthouse"));
    }

    #[test]
    fn record_description_lists_flags_and_metadata() {
        let metadata: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"seed": 42, "prompt": "cat"}"#).unwrap();
        let record = GeneratedImageRecord::new(
            GenerationParams::new("cat").with_flag(GenerationFlag::NoLogo),
            Some(EmbeddedMetadata::from_map(metadata)),
        );

        let text = format_record(&record);
        assert!(text.contains("flags:    nologo"));
        assert!(text.contains("  prompt: cat"));
        assert!(text.contains("  seed: 42"));
    }

    #[test]
    fn record_without_metadata() {
        let record = GeneratedImageRecord::new(GenerationParams::new("x"), None);
        assert!(format_record(&record).contains("metadata: (none)"));
    }
}
