pub mod app;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod search;

pub use error::{RecallError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
