//! The validation engine
//!
//! `evaluate` pairs one descriptor with one policy set and produces a
//! verdict. It is a pure function: no I/O, no mutation, and it never fails
//! for well-formed inputs — malformed policies are rejected at load time,
//! and every rule violation is represented as data on the verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::DeviceDescriptor;
use crate::policy::{Constraint, PolicyRule, PolicySet, Severity};
use crate::value::AttrValue;

/// Overall status of a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// No error-severity rule failed
    Pass,
    /// At least one error-severity rule failed
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictStatus::Pass => write!(f, "pass"),
            VerdictStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Outcome of a single rule evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Rule that produced this outcome
    pub rule_id: String,
    /// Severity of the rule
    pub severity: Severity,
    /// Whether the constraint held
    pub passed: bool,
    /// Failure message, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of evaluating one descriptor against one policy set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Device the verdict is about
    pub device_id: String,
    /// Overall status
    pub status: VerdictStatus,
    /// Per-rule outcomes, in policy set order
    pub outcomes: Vec<RuleOutcome>,
    /// When the evaluation ran
    pub evaluated_at: DateTime<Utc>,
}

impl Verdict {
    /// Whether the verdict passed
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Pass
    }

    /// Outcomes of rules that did not hold
    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Evaluate a descriptor against a policy set.
///
/// Applicable rules (exact type match or wildcard) are evaluated in the
/// policy set's stored order, which makes verdicts reproducible. Every
/// failing rule is reported, not just the first.
pub fn evaluate(descriptor: &DeviceDescriptor, policies: &PolicySet) -> Verdict {
    let mut outcomes = Vec::new();
    let mut failed_error = false;

    for rule in policies.applicable(&descriptor.device_type) {
        let outcome = evaluate_rule(descriptor, rule);
        if !outcome.passed && outcome.severity == Severity::Error {
            failed_error = true;
        }
        outcomes.push(outcome);
    }

    let status = if failed_error {
        VerdictStatus::Fail
    } else {
        VerdictStatus::Pass
    };

    debug!(
        device_id = %descriptor.device_id,
        rules = outcomes.len(),
        %status,
        "evaluated descriptor"
    );

    Verdict {
        device_id: descriptor.device_id.clone(),
        status,
        outcomes,
        evaluated_at: Utc::now(),
    }
}

fn evaluate_rule(descriptor: &DeviceDescriptor, rule: &PolicyRule) -> RuleOutcome {
    // Vocabulary constraints look at the whole descriptor, not one field
    let result = match &rule.constraint {
        Constraint::DeviceType { allowed } => check_device_type(&descriptor.device_type, allowed),
        Constraint::Fields { allowed } => check_fields(descriptor, allowed),
        constraint => check_constraint(
            constraint,
            descriptor.attribute(&rule.field_path),
            &rule.field_path,
        ),
    };

    match result {
        Ok(()) => RuleOutcome {
            rule_id: rule.rule_id.clone(),
            severity: rule.severity,
            passed: true,
            message: None,
        },
        Err(message) => RuleOutcome {
            rule_id: rule.rule_id.clone(),
            severity: rule.severity,
            passed: false,
            message: Some(message),
        },
    }
}

fn check_device_type(device_type: &str, allowed: &[String]) -> Result<(), String> {
    if allowed.iter().any(|candidate| candidate == device_type) {
        Ok(())
    } else {
        Err(format!(
            "'{}' is not a recognized device type, must be one of [{}]",
            device_type,
            allowed.join(", ")
        ))
    }
}

fn check_fields(descriptor: &DeviceDescriptor, allowed: &[String]) -> Result<(), String> {
    let disallowed: Vec<&str> = descriptor
        .attributes
        .keys()
        .filter(|key| !allowed.iter().any(|candidate| candidate == key.as_str()))
        .map(|key| key.as_str())
        .collect();
    if disallowed.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "disallowed fields for {}: [{}]",
            descriptor.device_type,
            disallowed.join(", ")
        ))
    }
}

/// Check a constraint against a resolved value; `Err` carries the failure
/// message. Absence fails every constraint kind: a range/enum/regex/type
/// cannot be checked against a missing value.
fn check_constraint(
    constraint: &Constraint,
    value: Option<&AttrValue>,
    path: &str,
) -> Result<(), String> {
    let value = match value {
        Some(v) => v,
        None => {
            return match constraint {
                Constraint::Presence => Err(format!("required field {} is missing", path)),
                _ => Err(format!("field {} missing", path)),
            };
        }
    };

    match constraint {
        Constraint::Presence => Ok(()),
        Constraint::Range { min, max } => {
            let number = value.as_number().ok_or_else(|| {
                format!("{} must be numeric, got {}", path, value.type_name())
            })?;
            let below = min.map(|lo| number < lo).unwrap_or(false);
            let above = max.map(|hi| number > hi).unwrap_or(false);
            if below || above {
                return Err(match (min, max) {
                    (Some(lo), Some(hi)) => format!(
                        "{} must be between {} and {}, got {}",
                        path, lo, hi, number
                    ),
                    (Some(lo), None) => {
                        format!("{} must be at least {}, got {}", path, lo, number)
                    }
                    (None, Some(hi)) => {
                        format!("{} must be at most {}, got {}", path, hi, number)
                    }
                    (None, None) => unreachable!("unbounded range rejected at load"),
                });
            }
            Ok(())
        }
        Constraint::Enum { allowed } => {
            let text = value.as_str().ok_or_else(|| {
                format!("{} must be a string, got {}", path, value.type_name())
            })?;
            if allowed.iter().any(|candidate| candidate == text) {
                Ok(())
            } else {
                Err(format!(
                    "'{}' is not a valid value for {}, must be one of [{}]",
                    text,
                    path,
                    allowed.join(", ")
                ))
            }
        }
        Constraint::Regex { pattern } => {
            // A non-string value is an ordinary failure, keeping evaluation total
            let text = value.as_str().ok_or_else(|| {
                format!("{} must be a string, got {}", path, value.type_name())
            })?;
            if pattern.is_match(text) {
                Ok(())
            } else {
                Err(format!(
                    "'{}' does not match pattern {} for {}",
                    text,
                    pattern.as_str(),
                    path
                ))
            }
        }
        Constraint::Type { expected } => {
            if expected.matches(value) {
                Ok(())
            } else {
                Err(format!(
                    "{} must be a {}, got {}",
                    path,
                    expected,
                    value.type_name()
                ))
            }
        }
        // Routed through the descriptor-level checks in evaluate_rule
        Constraint::DeviceType { .. } | Constraint::Fields { .. } => Ok(()),
    }
}
