// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `drivers` command.

use crate::cli::Cli;
use crate::error::BinResult;
use crate::runtime::build_registry;

/// Lists the protocol types compiled into this binary.
pub fn drivers(_cli: &Cli) -> BinResult<()> {
    let registry = build_registry();

    println!("Registered source drivers ({}):", registry.len());
    for source_type in registry.registered_types() {
        println!("  {}", source_type);
    }

    Ok(())
}
