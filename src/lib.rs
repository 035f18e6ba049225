//! Device Validation Engine
//!
//! Validates device configurations against a declarative policy set.
//!
//! ## Features
//!
//! - **Policy Loading**: Declarative rule documents in JSON, YAML, or TOML
//! - **Device Registry**: In-memory registry with point-in-time snapshots
//! - **Pure Evaluation**: Deterministic verdicts with per-rule outcomes
//! - **Batch Validation**: Concurrent batches with per-item isolation,
//!   request-order results, and cooperative cancellation
//! - **Built-in Rules**: Ready-made policy set for a smart-home fleet
//! - **CLI Support**: Full command-line interface with table/JSON/YAML output
//!
//! ## Architecture
//!
//! 1. **Policy** (`policy/`): Rule types, the two-stage loader, and the
//!    built-in smart-home rules.
//!
//! 2. **Registry** (`registry`): Device descriptors keyed by id; readers
//!    take immutable snapshots so concurrent mutation never tears a batch.
//!
//! 3. **Engine** (`engine`): Pure evaluation of one descriptor against one
//!    policy set. Rule violations are data on the verdict, never errors.
//!
//! 4. **Service** (`service`): Async batch orchestration over a snapshot.
//!
//! 5. **CLI** (`cli/`): Commands for validation, policy inspection, and
//!    device listing with machine-readable output.
//!
//! ## CLI Usage
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
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use device_validation::{
//!     policy::PolicySet,
//!     registry::DeviceRegistry,
//!     service::ValidationService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> device_validation::Result<()> {
//!     let policies = Arc::new(PolicySet::load_path("rules.yaml".as_ref())?);
//!     let registry = DeviceRegistry::from_source("fleet.json".as_ref())?;
//!
//!     let service = ValidationService::new(registry.snapshot(), policies);
//!     let result = service.validate_all().await;
//!     println!("{} passed, {} failed", result.passed, result.failed);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod device;
pub mod engine;
pub mod error;
pub mod format;
pub mod policy;
pub mod registry;
pub mod service;
pub mod value;

pub use cli::{DeviceValidateCli, DeviceValidateCommands, ExitCode, OutputFormat};
pub use device::DeviceDescriptor;
pub use engine::{evaluate, RuleOutcome, Verdict, VerdictStatus};
pub use error::{Result, ValidationError};
pub use format::DocFormat;
pub use policy::{Constraint, DeviceTypeSelector, PolicyRule, PolicySet, Severity};
pub use registry::{DeviceRegistry, RegistrySnapshot};
pub use service::{BatchEntry, BatchResult, CancelFlag, ValidationService};
pub use value::AttrValue;

/// Engine version (from Cargo.toml)
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI application
///
/// This is the main entry point for the CLI binary.
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use device_validation::{run_cli, DeviceValidateCli};
///
/// fn main() {
///     let cli = DeviceValidateCli::parse();
///     let exit_code = run_cli(cli);
///     std::process::exit(exit_code.into());
/// }
/// ```
pub fn run_cli(cli: DeviceValidateCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
