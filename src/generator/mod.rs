//! generator
//!
//! Abstraction for remote image generators.
//!
//! # Architecture
//!
//! The `ImageGenerator` trait defines the single remote call the session
//! makes. The session never knows which implementation it talks to.
//!
//! - Generation failures never touch local state
//! - One request per generation, no retry
//! - The payload is handed to the session untouched
//!
//! # Modules
//!
//! - `traits`: Core `ImageGenerator` trait and request/error types
//! - [`pollinations`]: HTTP implementation for the Pollinations endpoint
//! - [`mock`]: Mock implementation for deterministic testing

pub mod mock;
pub mod pollinations;
mod traits;

pub use pollinations::PollinationsGenerator;
pub use traits::*;
