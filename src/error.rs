//! Error types for the device validation engine
//!
//! Structurally invalid inputs (malformed policy documents, unknown devices)
//! surface as errors; a failed rule evaluation is never an error, it is data
//! on the verdict.

use thiserror::Error;

/// Main error type for validation operations
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    File(String),

    /// Policy document could not be parsed
    #[error("Policy parse error: {0}")]
    ConfigParse(String),

    /// Policy document parsed but violates the policy schema
    #[error("Policy schema error: {0}")]
    ConfigSchema(String),

    /// Requested device is not present in the registry
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Identity conflict on upsert
    #[error("Duplicate device: {0}")]
    DuplicateDevice(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ValidationError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ValidationError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file(msg: impl Into<String>) -> Self {
        ValidationError::File(msg.into())
    }

    /// Create a policy parse error
    pub fn config_parse(msg: impl Into<String>) -> Self {
        ValidationError::ConfigParse(msg.into())
    }

    /// Create a policy schema error
    pub fn config_schema(msg: impl Into<String>) -> Self {
        ValidationError::ConfigSchema(msg.into())
    }

    /// Create a not-found error for a device id
    pub fn not_found(device_id: impl Into<String>) -> Self {
        ValidationError::NotFound(device_id.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidInput(_)
                | ValidationError::File(_)
                | ValidationError::ConfigParse(_)
                | ValidationError::ConfigSchema(_)
                | ValidationError::NotFound(_)
                | ValidationError::DuplicateDevice(_)
        )
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::File(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::ConfigParse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        ValidationError::ConfigParse(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ValidationError {
    fn from(err: toml::de::Error) -> Self {
        ValidationError::ConfigParse(format!("TOML error: {}", err))
    }
}

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ValidationError::NotFound("sensor-1".to_string());
        assert_eq!(err.to_string(), "Device not found: sensor-1");
    }

    #[test]
    fn test_is_user_error() {
        assert!(ValidationError::invalid_input("test").is_user_error());
        assert!(ValidationError::config_parse("test").is_user_error());
        assert!(ValidationError::not_found("d1").is_user_error());
        assert!(!ValidationError::Internal("test".to_string()).is_user_error());
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            ValidationError::config_schema("bad kind"),
            ValidationError::ConfigSchema(_)
        ));
        assert!(matches!(
            ValidationError::file("missing"),
            ValidationError::File(_)
        ));
    }
}
