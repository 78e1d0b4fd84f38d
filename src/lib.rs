//! pollen - generate, inspect, and keep AI-generated images
//!
//! pollen requests images from a remote text-to-image service, decodes the
//! metadata the model embeds inside the returned image bytes, and keeps a
//! local collection of saved images with the exact parameters that
//! produced them.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, drives a session)
//! - [`session`] - Generation orchestration and display-handle lifecycle
//! - [`core`] - Domain types, parameters, records, metadata codec, config
//! - [`generator`] - Abstraction for the remote image service
//! - [`store`] - Durable storage for saved images
//! - [`secrets`] - Secret storage for the API token
//! - [`ui`] - User interaction utilities
//!
//! # Invariants
//!
//! pollen maintains the following invariants:
//!
//! 1. At most one live display handle per resource key
//! 2. Every handle created is released exactly once
//! 3. A superseded generation never changes session state
//! 4. Unreadable saved records are skipped, never fatal

pub mod cli;
pub mod core;
pub mod generator;
pub mod secrets;
pub mod session;
pub mod store;
pub mod ui;
