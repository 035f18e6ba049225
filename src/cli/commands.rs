//! CLI command definitions
//!
//! Clap-based commands for validating device fleets, printing the effective
//! policy set, and listing registered devices.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use super::output::{BatchOutput, OutputFormat};
use super::ExitCode;
use crate::error::{Result, ValidationError};
use crate::format::DocFormat;
use crate::policy::{builtin, PolicySet};
use crate::registry::DeviceRegistry;
use crate::service::ValidationService;

/// Device validation CLI
///
/// Validate device configurations against policy rules, inspect the
/// effective policy set, and list registered devices.
#[derive(Parser, Debug)]
#[command(name = "device-validate")]
#[command(about = "Validate device configurations against policy rules", long_about = None)]
#[command(version)]
pub struct DeviceValidateCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: DeviceValidateCommands,
}

impl DeviceValidateCli {
    /// Tracing level implied by the verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::WARN,
                1 => tracing::Level::INFO,
                2 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum DeviceValidateCommands {
    /// Validate devices against a policy set
    ///
    /// Loads devices from a file or directory and evaluates each one against
    /// the policy set. With no device ids, the whole fleet is validated.
    Validate {
        /// Path to the policy document (json, yaml, or toml)
        #[arg(short, long, conflicts_with = "builtin")]
        policies: Option<PathBuf>,

        /// Use the built-in smart-home policy set
        #[arg(long)]
        builtin: bool,

        /// Path to the device source (file or directory)
        #[arg(short, long)]
        devices: PathBuf,

        /// Device ids to validate (defaults to every registered device)
        device: Vec<String>,

        /// Output format for validation results
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// Print the effective policy set
    ShowPolicy {
        /// Path to the policy document (json, yaml, or toml)
        #[arg(short, long, conflicts_with = "builtin")]
        policies: Option<PathBuf>,

        /// Use the built-in smart-home policy set
        #[arg(long)]
        builtin: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// List registered devices
    Devices {
        /// Path to the device source (file or directory)
        #[arg(short, long)]
        devices: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },
}

fn load_policies(policies: Option<PathBuf>, use_builtin: bool) -> Result<PolicySet> {
    match (policies, use_builtin) {
        (Some(path), false) => PolicySet::load_path(&path),
        (None, true) => builtin::smart_home_policy_set(),
        (None, false) => Err(ValidationError::invalid_input(
            "either --policies or --builtin is required",
        )),
        (Some(_), true) => Err(ValidationError::invalid_input(
            "--policies and --builtin are mutually exclusive",
        )),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ValidationError::Internal(format!("failed to start runtime: {}", e)))
}

/// Execute the validate command
pub fn execute_validate(
    policies: Option<PathBuf>,
    use_builtin: bool,
    devices: PathBuf,
    device_ids: Vec<String>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let policy_set = Arc::new(load_policies(policies, use_builtin)?);
    let registry = DeviceRegistry::from_source(&devices)?;
    let service = ValidationService::new(registry.snapshot(), policy_set);

    let result = runtime()?.block_on(async {
        if device_ids.is_empty() {
            service.validate_all().await
        } else {
            service.validate_batch(&device_ids).await
        }
    });

    let output_format = format.unwrap_or(OutputFormat::Table);
    BatchOutput::from_result(&result).render(output_format)?;

    Ok(ExitCode::from_batch(&result))
}

/// Execute the show-policy command
pub fn execute_show_policy(
    policies: Option<PathBuf>,
    use_builtin: bool,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let policy_set = load_policies(policies, use_builtin)?;

    match format.unwrap_or(OutputFormat::Table) {
        OutputFormat::Json => {
            println!("{}", policy_set.to_document(DocFormat::Json)?);
        }
        OutputFormat::Yaml => {
            println!("{}", policy_set.to_document(DocFormat::Yaml)?);
        }
        OutputFormat::Table => {
            print_policy_table(&policy_set);
        }
    }

    Ok(ExitCode::Success)
}

/// Execute the devices command
pub fn execute_devices(devices: PathBuf, format: Option<OutputFormat>) -> Result<ExitCode> {
    let registry = DeviceRegistry::from_source(&devices)?;
    let snapshot = registry.snapshot();

    match format.unwrap_or(OutputFormat::Table) {
        OutputFormat::Json => {
            let docs: Vec<_> = snapshot.iter().map(Arc::as_ref).collect();
            let json = serde_json::to_string_pretty(&docs)
                .map_err(|e| ValidationError::Serialization(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let docs: Vec<_> = snapshot.iter().map(Arc::as_ref).collect();
            let yaml = serde_yaml::to_string(&docs)
                .map_err(|e| ValidationError::Serialization(e.to_string()))?;
            println!("{}", yaml);
        }
        OutputFormat::Table => {
            println!("{}", "Registered Devices".cyan().bold());
            println!("{}", "=".repeat(60));
            for descriptor in snapshot.iter() {
                println!(
                    "{:24} {:16} {} attribute(s)",
                    descriptor.device_id.bold(),
                    descriptor.device_type.green(),
                    descriptor.attributes.len()
                );
            }
            println!();
            println!("Total: {}", snapshot.len());
        }
    }

    Ok(ExitCode::Success)
}

/// Print the policy set in table format
fn print_policy_table(policies: &PolicySet) {
    println!("{}", "Policy Set".cyan().bold());
    println!("{}", "=".repeat(60));

    for rule in policies.rules() {
        let severity = match rule.severity {
            crate::policy::Severity::Error => "error".red().bold(),
            crate::policy::Severity::Warning => "warning".yellow().bold(),
        };
        println!(
            "{:32} [{}] {} on {} ({})",
            rule.rule_id.bold(),
            severity,
            rule.constraint.kind().blue(),
            rule.field_path.cyan(),
            rule.applies_to
        );
    }

    println!();
    println!("Total: {} rule(s)", policies.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_policies_requires_a_source() {
        let err = load_policies(None, false).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInput(_)));
    }

    #[test]
    fn test_load_builtin_policies() {
        let set = load_policies(None, true).unwrap();
        assert!(!set.is_empty());
    }

    #[test]
    fn test_cli_parses_validate() {
        let cli = DeviceValidateCli::try_parse_from([
            "device-validate",
            "validate",
            "--builtin",
            "--devices",
            "fleet.json",
            "lamp-1",
            "lock-1",
        ])
        .unwrap();
        match cli.command {
            DeviceValidateCommands::Validate {
                builtin,
                devices,
                device,
                ..
            } => {
                assert!(builtin);
                assert_eq!(devices, PathBuf::from("fleet.json"));
                assert_eq!(device, vec!["lamp-1", "lock-1"]);
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn test_verbosity_flags_map_to_levels() {
        let parse = |args: &[&str]| DeviceValidateCli::try_parse_from(args).unwrap();

        let base = ["device-validate", "devices", "--devices", "fleet.json"];
        assert_eq!(parse(&base).log_level(), tracing::Level::WARN);

        let mut verbose = base.to_vec();
        verbose.push("-vv");
        assert_eq!(parse(&verbose).log_level(), tracing::Level::DEBUG);

        let mut quiet = base.to_vec();
        quiet.push("--quiet");
        assert_eq!(parse(&quiet).log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_cli_rejects_policies_with_builtin() {
        let parsed = DeviceValidateCli::try_parse_from([
            "device-validate",
            "validate",
            "--builtin",
            "--policies",
            "rules.yaml",
            "--devices",
            "fleet.json",
        ]);
        assert!(parsed.is_err());
    }
}
