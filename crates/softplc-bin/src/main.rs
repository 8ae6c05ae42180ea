// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! softplc - soft PLC runtime
//!
//! Main binary entry point.

use softplc_bin::error::report_error_and_exit;
use softplc_bin::{Cli, commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}
