//! Device validation CLI
//!
//! # Usage
//!
//! ```bash
//! # Validate a fleet against a policy document
//! device-validate validate --policies rules.yaml --devices fleet.json
//!
//! # Validate specific devices with the built-in smart-home rules
//! device-validate validate --builtin --devices fleet/ lamp-1 lock-1
//!
//! # Print the effective policy set
//! device-validate show-policy --builtin --format yaml
//!
//! # List registered devices
//! device-validate devices --devices fleet/
//! ```
//!
//! # Exit Codes
//!
//! - 0: Every requested device passed validation
//! - 1: At least one device failed validation
//! - 2: No failures, but at least one device skipped or batch cancelled
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Policy document parse or schema errors
//! - 10: Internal error

use clap::Parser;
use device_validation::{run_cli, DeviceValidateCli};

fn main() {
    let cli = DeviceValidateCli::parse();

    // -v/-q set the default level; RUST_LOG directives still win
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_level().into()),
        )
        .with_target(false)
        .init();

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
