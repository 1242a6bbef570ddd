//! Logging utilities for vector_tools
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Parse a configured level name, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging based on configuration.
///
/// A configured file takes precedence over stdout; with neither, no
/// subscriber is installed.
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    // Pick the writer; ANSI colours only make sense on a terminal
    let (writer, ansi) = match &config.file {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            (BoxMakeWriter::new(File::create(file_path)?), false)
        }
        None if config.stdout => (BoxMakeWriter::new(std::io::stdout), true),
        None => return Ok(()),
    };

    let level = parse_level(&config.level);
    let directive = format!("vector_tools={}", level)
        .parse::<Directive>()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let installed = if config.format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.map_err(|e| Error::ConfigError(e.to_string()))
}
