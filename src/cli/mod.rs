//! CLI for the device validation engine
//!
//! Validate device fleets against policy documents, print the effective
//! policy set, and list registered devices.

pub mod commands;
pub mod output;

pub use commands::{DeviceValidateCli, DeviceValidateCommands};
pub use output::{BatchOutput, OutputFormat};

use crate::error::ValidationError;
use crate::service::BatchResult;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every requested device passed validation
    Success = 0,
    /// At least one device failed validation
    ValidationFailed = 1,
    /// No failures, but at least one device was skipped or the batch cancelled
    Skipped = 2,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Policy document parse or schema errors
    PolicyError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine the exit code from a batch result
    pub fn from_batch(result: &BatchResult) -> Self {
        if result.failed > 0 {
            ExitCode::ValidationFailed
        } else if result.skipped > 0 || result.cancelled {
            ExitCode::Skipped
        } else {
            ExitCode::Success
        }
    }

    /// Determine the exit code for an error
    pub fn from_error(err: &ValidationError) -> Self {
        match err {
            ValidationError::InvalidInput(_) | ValidationError::DuplicateDevice(_) => {
                ExitCode::InvalidInput
            }
            ValidationError::File(_) | ValidationError::NotFound(_) => ExitCode::FileError,
            ValidationError::ConfigParse(_) | ValidationError::ConfigSchema(_) => {
                ExitCode::PolicyError
            }
            ValidationError::Serialization(_) | ValidationError::Internal(_) => {
                ExitCode::InternalError
            }
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: DeviceValidateCli) -> Result<ExitCode, ValidationError> {
    match cli.command {
        DeviceValidateCommands::Validate {
            policies,
            builtin,
            devices,
            device,
            format,
        } => commands::execute_validate(policies, builtin, devices, device, format),
        DeviceValidateCommands::ShowPolicy {
            policies,
            builtin,
            format,
        } => commands::execute_show_policy(policies, builtin, format),
        DeviceValidateCommands::Devices { devices, format } => {
            commands::execute_devices(devices, format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_conversion() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::ValidationFailed), 1);
        assert_eq!(i32::from(ExitCode::Skipped), 2);
        assert_eq!(i32::from(ExitCode::InternalError), 10);
    }

    #[test]
    fn test_exit_code_from_batch() {
        let mut result = BatchResult {
            entries: vec![],
            passed: 2,
            failed: 0,
            skipped: 0,
            cancelled: false,
        };
        assert_eq!(ExitCode::from_batch(&result), ExitCode::Success);

        result.skipped = 1;
        assert_eq!(ExitCode::from_batch(&result), ExitCode::Skipped);

        result.failed = 1;
        assert_eq!(ExitCode::from_batch(&result), ExitCode::ValidationFailed);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from_error(&ValidationError::config_parse("bad")),
            ExitCode::PolicyError
        );
        assert_eq!(
            ExitCode::from_error(&ValidationError::file("missing")),
            ExitCode::FileError
        );
        assert_eq!(
            ExitCode::from_error(&ValidationError::invalid_input("bad")),
            ExitCode::InvalidInput
        );
        assert_eq!(
            ExitCode::from_error(&ValidationError::Internal("boom".to_string())),
            ExitCode::InternalError
        );
    }
}
