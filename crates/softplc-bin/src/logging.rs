// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use softplc_config::{LogFormat, LogLevel, LoggingConfig};

use crate::error::{BinError, BinResult};

/// Directives appended to the level so chatty dependencies stay quiet.
const DEPENDENCY_DIRECTIVES: &str = "tokio_modbus=warn,tokio=info";

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the global subscriber.
///
/// `RUST_LOG`, when set, replaces the configured level entirely.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the filter is
/// malformed.
pub fn init_logging(settings: LoggingConfig) -> BinResult<()> {
    let filter = build_filter(settings.level)?;

    let result = match settings.format {
        LogFormat::Text => init_text_logging(filter),
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Compact => init_compact_logging(filter),
    };

    result.map_err(|e| BinError::init(format!("cannot install log subscriber: {}", e)))
}

fn build_filter(level: LogLevel) -> BinResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(filter_directives(level))
        .map_err(|e| BinError::init(format!("invalid log filter: {}", e)))
}

/// Returns the filter directives for `level`.
fn filter_directives(level: LogLevel) -> String {
    format!("{},{}", level.as_str(), DEPENDENCY_DIRECTIVES)
}

fn init_text_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(is_terminal),
        )
        .try_init()
}

/// JSON lines for log aggregation.
fn init_json_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(false),
        )
        .try_init()
}

fn init_compact_logging(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_ansi(is_terminal),
        )
        .try_init()
}

// =============================================================================
// Tests
// =============================================================================
