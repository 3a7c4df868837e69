//! cx-core: Configuration, errors and shared types for Cindex Link
//!
//! This crate provides the configuration structures, error taxonomy and
//! domain types shared by the session engine and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use error::{ClientError, ConfigError, ConnectionError};
pub use types::ConnectionState;
