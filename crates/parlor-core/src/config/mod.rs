//! Configuration module for the relay
//!
//! YAML configuration for the model connection, the memory policy and the
//! system instruction, with defaults for everything but the credential.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::*;
pub use types::*;
