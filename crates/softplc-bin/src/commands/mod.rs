// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Start the runtime
//! - `validate`: Validate the configuration file
//! - `drivers`: List registered drivers
//! - `version`: Show version information

mod drivers;
mod run;
mod validate;
mod version;

pub use drivers::drivers;
pub use run::run;
pub use validate::{AcceptedSource, ValidationReport, validate, validation_report};
pub use version::version;

use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Executes the appropriate command based on CLI arguments.
///
/// `run` sets up logging itself once the file's logging section is known;
/// every other command logs according to the command line alone.
pub async fn execute(cli: Cli) -> BinResult<()> {
    let command = cli.effective_command();
    if !matches!(command, Commands::Run) {
        init_logging(cli.logging(None))?;
    }

    match command {
        Commands::Run => run::run(&cli).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Drivers => drivers::drivers(&cli),
        Commands::Version => version::version(&cli),
    }
}

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> BinResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("cannot serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
