// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;
use crate::runtime::build_registry;

/// Executes the `version` command; `--verbose` adds build details.
pub fn version(cli: &Cli) -> BinResult<()> {
    println!("softplc {}", env!("CARGO_PKG_VERSION"));

    if !cli.verbose {
        return Ok(());
    }

    let drivers: Vec<String> = build_registry().registered_types().into_iter().collect();

    println!();
    println!("Version Information:");
    println!("  softplc-bin:  {}", env!("CARGO_PKG_VERSION"));
    println!("  softplc-core: {}", softplc_core::VERSION);
    println!();
    println!("Build Information:");
    println!("  Rust Edition: 2024");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!("  Drivers:      {}", drivers.join(", "));
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
