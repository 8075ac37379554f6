//! Command implementations behind the `lox` binary.
//!
//! Commands take source text and return a [`Report`]; the binary owns file access, process exit
//! codes and terminal detection.
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod error;

pub use commands::{CheckOptions, Report, check_source, parse_source, tokens_source};
pub use config::{
    CONFIG_FILE, CheckConfig, ColorMode, LoxToml, OutputConfig, OutputFormat, load_config,
    parse_lox_toml, read_lox_toml,
};
pub use error::CliError;
