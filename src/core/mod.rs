//! core
//!
//! Core domain types, schemas, and the metadata codec for pollen.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RecordId, ResourceKey, PayloadDigest, etc.
//! - [`params`] - Generation parameters, models, flags, and size presets
//! - [`record`] - Image records, payloads, and their persisted form
//! - [`codec`] - Extraction of metadata embedded in image payloads
//! - [`format`] - Export formats and transcoding
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for pollen storage
//! - [`lock`] - Exclusive lock over the record store
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing in core performs network I/O

pub mod codec;
pub mod config;
pub mod format;
pub mod lock;
pub mod params;
pub mod paths;
pub mod record;
pub mod types;
