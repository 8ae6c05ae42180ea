// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::path::Path;

use serde::Serialize;

use softplc_config::{RejectionSummary, load_config, resolve_sources};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::build_registry;

/// Result of validating a configuration file.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// The validated file.
    pub config_path: String,
    /// Runtime instance name.
    pub runtime: String,
    /// Sources that would run.
    pub accepted: Vec<AcceptedSource>,
    /// Sources that would be skipped.
    pub rejected: Vec<RejectionSummary>,
}

impl ValidationReport {
    /// Returns `true` if no source was rejected.
    pub fn is_valid(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// An accepted source as shown by `validate`.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedSource {
    /// Source name.
    pub name: String,
    /// Protocol type.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Human-readable endpoint.
    pub endpoint: String,
    /// Effective poll interval.
    pub poll_interval: String,
    /// Effective operation timeout.
    pub timeout: String,
    /// Effective retry interval.
    pub retry_interval: String,
}

/// Loads `path` and resolves every source without connecting to anything.
pub fn validation_report(path: &Path) -> BinResult<ValidationReport> {
    let config = load_config(path)?;
    let resolution = resolve_sources(&build_registry(), &config.sources);

    let accepted = resolution
        .configs
        .iter()
        .map(|validated| {
            let timing = validated.timing();
            AcceptedSource {
                name: validated.name().to_string(),
                source_type: validated.protocol_type().to_string(),
                endpoint: validated.endpoint(),
                poll_interval: humantime::format_duration(timing.poll_interval).to_string(),
                timeout: humantime::format_duration(timing.timeout).to_string(),
                retry_interval: humantime::format_duration(timing.retry_interval).to_string(),
            }
        })
        .collect();

    Ok(ValidationReport {
        config_path: path.display().to_string(),
        runtime: config.runtime.name,
        accepted,
        rejected: resolution.rejected.iter().map(|r| r.summary()).collect(),
    })
}

/// Executes the `validate` command.
///
/// Fails with [`BinError::SourcesRejected`] if any source entry is invalid.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let report = validation_report(&cli.config)?;

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => super::print_json(&report)?,
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(BinError::SourcesRejected {
            rejected: report.rejected.len(),
            total: report.rejected.len() + report.accepted.len(),
        })
    }
}

fn print_text(report: &ValidationReport) {
    let mark = if report.is_valid() { "✓" } else { "✗" };
    println!("{} Configuration: {}", mark, report.config_path);
    println!();
    println!("Summary:");
    println!("  Runtime:  {}", report.runtime);
    println!("  Accepted: {}", report.accepted.len());
    println!("  Rejected: {}", report.rejected.len());

    if !report.accepted.is_empty() {
        println!();
        println!("Sources:");
        for source in &report.accepted {
            println!(
                "  ✓ {} [{}] {} (poll {}, timeout {}, retry {})",
                source.name,
                source.source_type,
                source.endpoint,
                source.poll_interval,
                source.timeout,
                source.retry_interval
            );
        }
    }

    if !report.rejected.is_empty() {
        println!();
        println!("Rejected:");
        for rejected in &report.rejected {
            let name = if rejected.name.is_empty() { "<unnamed>" } else { &rejected.name };
            println!("  ✗ {}: {}", name, rejected.message);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
