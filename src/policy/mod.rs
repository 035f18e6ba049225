//! Policy rules and the policy loader
//!
//! A policy document is a list of rules; each rule ties a constraint to a
//! field path and a device type selector. Loading is two-staged: syntax
//! errors surface as [`ValidationError::ConfigParse`], structural problems
//! (unknown constraint kinds, bad regexes, duplicate ids, inverted ranges)
//! as [`ValidationError::ConfigSchema`]. The resulting [`PolicySet`] is
//! immutable; a reload produces a fresh set and never touches one already
//! handed to in-flight validations.

pub mod builtin;

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ValidationError};
use crate::format::{self, DocFormat};
use crate::value::AttrValue;

/// Severity of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Should be addressed, does not fail the verdict
    Warning,
    /// Fails the verdict
    #[default]
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Expected type tag for a `type` constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Float,
    /// Integer or float
    Number,
    Bool,
    List,
}

impl TypeTag {
    /// Check a value against the tag
    pub fn matches(&self, value: &AttrValue) -> bool {
        match (self, value) {
            (TypeTag::String, AttrValue::String(_)) => true,
            (TypeTag::Integer, AttrValue::Integer(_)) => true,
            (TypeTag::Float, AttrValue::Float(_)) => true,
            (TypeTag::Number, AttrValue::Integer(_) | AttrValue::Float(_)) => true,
            (TypeTag::Bool, AttrValue::Bool(_)) => true,
            (TypeTag::List, AttrValue::List(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Number => "number",
            TypeTag::Bool => "bool",
            TypeTag::List => "list",
        };
        write!(f, "{}", name)
    }
}

/// A compiled regular expression that serializes as its pattern string
#[derive(Debug, Clone)]
pub struct RegexPattern(Regex);

impl RegexPattern {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(RegexPattern)
            .map_err(|e| ValidationError::ConfigSchema(format!("invalid regex '{}': {}", pattern, e)))
    }

    /// The source pattern
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Test a string against the pattern
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for RegexPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegexPattern {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Regex::new(&pattern)
            .map(RegexPattern)
            .map_err(|e| serde::de::Error::custom(format!("invalid regex '{}': {}", pattern, e)))
    }
}

/// Typed predicate applied to a resolved field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Constraint {
    /// Numeric range with inclusive bounds
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Exact, case-sensitive membership in a string set
    Enum { allowed: Vec<String> },
    /// String pattern match
    Regex { pattern: RegexPattern },
    /// The field must be present
    Presence,
    /// The value's type tag must match
    Type { expected: TypeTag },
    /// The descriptor's device type must be in the allowed set
    #[serde(rename = "device_type")]
    DeviceType { allowed: Vec<String> },
    /// Every attribute key on the descriptor must be in the allowed set
    Fields { allowed: Vec<String> },
}

impl Constraint {
    /// Short name of the constraint kind
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Range { .. } => "range",
            Constraint::Enum { .. } => "enum",
            Constraint::Regex { .. } => "regex",
            Constraint::Presence => "presence",
            Constraint::Type { .. } => "type",
            Constraint::DeviceType { .. } => "device_type",
            Constraint::Fields { .. } => "fields",
        }
    }

    fn validate(&self, rule_id: &str) -> Result<()> {
        match self {
            Constraint::Range { min, max } => {
                if min.is_none() && max.is_none() {
                    return Err(ValidationError::ConfigSchema(format!(
                        "rule '{}': range constraint needs at least one bound",
                        rule_id
                    )));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(ValidationError::ConfigSchema(format!(
                            "rule '{}': range minimum {} exceeds maximum {}",
                            rule_id, lo, hi
                        )));
                    }
                }
                Ok(())
            }
            Constraint::Enum { allowed } => {
                if allowed.is_empty() {
                    return Err(ValidationError::ConfigSchema(format!(
                        "rule '{}': enum constraint needs at least one allowed value",
                        rule_id
                    )));
                }
                Ok(())
            }
            Constraint::DeviceType { allowed } | Constraint::Fields { allowed } => {
                if allowed.is_empty() {
                    return Err(ValidationError::ConfigSchema(format!(
                        "rule '{}': {} constraint needs at least one allowed value",
                        rule_id,
                        self.kind()
                    )));
                }
                Ok(())
            }
            Constraint::Regex { .. } | Constraint::Presence | Constraint::Type { .. } => Ok(()),
        }
    }
}

/// Device type selector: an exact type string or the `"*"` wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTypeSelector {
    /// Applies to every device type
    Any,
    /// Applies only to the named type
    Exact(String),
}

impl DeviceTypeSelector {
    /// Whether the selector covers the given device type
    pub fn matches(&self, device_type: &str) -> bool {
        match self {
            DeviceTypeSelector::Any => true,
            DeviceTypeSelector::Exact(t) => t == device_type,
        }
    }
}

impl std::fmt::Display for DeviceTypeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceTypeSelector::Any => write!(f, "*"),
            DeviceTypeSelector::Exact(t) => write!(f, "{}", t),
        }
    }
}

impl Serialize for DeviceTypeSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DeviceTypeSelector::Any => serializer.serialize_str("*"),
            DeviceTypeSelector::Exact(t) => serializer.serialize_str(t),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceTypeSelector {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "*" {
            Ok(DeviceTypeSelector::Any)
        } else {
            Ok(DeviceTypeSelector::Exact(raw))
        }
    }
}

/// A single validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique identifier within a policy set
    pub rule_id: String,
    /// Device types this rule applies to
    pub applies_to: DeviceTypeSelector,
    /// Dotted path into the descriptor's attribute map
    pub field_path: String,
    /// The predicate to evaluate
    pub constraint: Constraint,
    /// Severity of a violation (defaults to error)
    #[serde(default)]
    pub severity: Severity,
}

/// On-disk policy document shape
#[derive(Debug, Serialize, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

/// Ordered, immutable collection of policy rules
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySet {
    rules: Vec<PolicyRule>,
}

impl PolicySet {
    /// Build a policy set from rules, checking structural invariants
    pub fn from_rules(rules: Vec<PolicyRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.rule_id.is_empty() {
                return Err(ValidationError::ConfigSchema(
                    "rule with empty rule_id".to_string(),
                ));
            }
            if !seen.insert(rule.rule_id.as_str()) {
                return Err(ValidationError::ConfigSchema(format!(
                    "duplicate rule_id '{}'",
                    rule.rule_id
                )));
            }
            if rule.field_path.is_empty() {
                return Err(ValidationError::ConfigSchema(format!(
                    "rule '{}': empty field_path",
                    rule.rule_id
                )));
            }
            rule.constraint.validate(&rule.rule_id)?;
        }
        Ok(Self { rules })
    }

    /// Load a policy set from document content
    pub fn load_str(content: &str, doc_format: DocFormat) -> Result<Self> {
        // Stage 1: syntax. Stage 2: shape and structural invariants.
        let value = format::parse(content, doc_format)?;
        let file: PolicyFile = serde_json::from_value(value)
            .map_err(|e| ValidationError::ConfigSchema(e.to_string()))?;
        let set = Self::from_rules(file.rules)?;
        info!(rules = set.len(), "loaded policy set");
        Ok(set)
    }

    /// Load a policy set from a file, choosing the format by extension.
    ///
    /// Reloading is just calling this again: the returned set is a fresh
    /// value, and callers swap an `Arc<PolicySet>` to publish it.
    pub fn load_path(path: &Path) -> Result<Self> {
        let doc_format = DocFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::File(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::load_str(&content, doc_format)
    }

    /// All rules, in stored order
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Rules applicable to a device type, in stored order
    pub fn applicable<'a>(&'a self, device_type: &'a str) -> impl Iterator<Item = &'a PolicyRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.applies_to.matches(device_type))
    }

    /// Look up a rule by id
    pub fn rule(&self, rule_id: &str) -> Option<&PolicyRule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Serialize the set back into a document
    pub fn to_document(&self, doc_format: DocFormat) -> Result<String> {
        let file = PolicyFile {
            rules: self.rules.clone(),
        };
        format::render(&file, doc_format)
    }
}
