//! Document format handling
//!
//! Policy and device sources may be JSON, YAML, or TOML; everything is
//! normalized through `serde_json::Value` for uniform processing.

use std::path::Path;

use crate::error::{Result, ValidationError};

/// Supported on-disk document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Yaml,
    Toml,
}

impl DocFormat {
    /// Determine the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(DocFormat::Json),
            "yaml" | "yml" => Ok(DocFormat::Yaml),
            "toml" => Ok(DocFormat::Toml),
            _ => Err(ValidationError::InvalidInput(format!(
                "Unsupported file format: '{}'. Supported formats: json, yaml, yml, toml",
                extension
            ))),
        }
    }

    /// Check whether a path carries a recognized extension
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Parse a document into a uniform JSON value
pub fn parse(content: &str, format: DocFormat) -> Result<serde_json::Value> {
    match format {
        DocFormat::Json => serde_json::from_str(content)
            .map_err(|e| ValidationError::ConfigParse(format!("Invalid JSON: {}", e))),
        DocFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| ValidationError::ConfigParse(format!("Invalid YAML: {}", e))),
        DocFormat::Toml => {
            let toml_value: toml::Value = toml::from_str(content)
                .map_err(|e| ValidationError::ConfigParse(format!("Invalid TOML: {}", e)))?;
            // Convert TOML to JSON Value for uniform processing
            serde_json::to_value(toml_value)
                .map_err(|e| ValidationError::Serialization(e.to_string()))
        }
    }
}

/// Read and parse a document file, choosing the format by extension
pub fn read_document(path: &Path) -> Result<serde_json::Value> {
    let format = DocFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        ValidationError::File(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    parse(&content, format)
}

/// Serialize a value in the requested format
pub fn render<T: serde::Serialize>(value: &T, format: DocFormat) -> Result<String> {
    match format {
        DocFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| ValidationError::Serialization(e.to_string())),
        DocFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| ValidationError::Serialization(e.to_string()))
        }
        DocFormat::Toml => toml::to_string_pretty(value)
            .map_err(|e| ValidationError::Serialization(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocFormat::from_path(&PathBuf::from("rules.json")).unwrap(),
            DocFormat::Json
        );
        assert_eq!(
            DocFormat::from_path(&PathBuf::from("rules.yml")).unwrap(),
            DocFormat::Yaml
        );
        assert_eq!(
            DocFormat::from_path(&PathBuf::from("rules.toml")).unwrap(),
            DocFormat::Toml
        );
        assert!(DocFormat::from_path(&PathBuf::from("rules.txt")).is_err());
    }

    #[test]
    fn test_parse_json() {
        let value = parse(r#"{"key": "value", "number": 42}"#, DocFormat::Json).unwrap();
        assert_eq!(value["key"], "value");
        assert_eq!(value["number"], 42);
    }

    #[test]
    fn test_parse_yaml() {
        let value = parse("key: value\nnumber: 42", DocFormat::Yaml).unwrap();
        assert_eq!(value["key"], "value");
        assert_eq!(value["number"], 42);
    }

    #[test]
    fn test_parse_toml() {
        let value = parse("key = \"value\"\nnumber = 42", DocFormat::Toml).unwrap();
        assert_eq!(value["key"], "value");
        assert_eq!(value["number"], 42);
    }

    #[test]
    fn test_parse_malformed_is_parse_error() {
        let err = parse("{not json", DocFormat::Json).unwrap_err();
        assert!(matches!(err, ValidationError::ConfigParse(_)));
    }
}
