// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use softplc_config::load_config;

use crate::cli::Cli;
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command.
///
/// Fails with a runtime error when a source had to be aborted or panicked
/// during shutdown.
pub async fn run(cli: &Cli) -> BinResult<()> {
    let config = load_config(&cli.config)?;
    init_logging(cli.logging(Some(&config.logging)))?;

    let report = RuntimeBuilder::new().config(config).build()?.run().await?;

    if report.is_clean() {
        Ok(())
    } else {
        Err(BinError::runtime(format!(
            "{} source(s) did not stop cleanly",
            report.aborted.len() + report.panicked.len()
        )))
    }
}
