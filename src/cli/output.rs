//! Output formatting for the device validation CLI
//!
//! Renders batch results as JSON, YAML, or a colored human-readable table.

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::error::{Result, ValidationError};
use crate::service::{BatchEntry, BatchResult};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Batch output structure for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Number of passing devices
    pub passed: usize,
    /// Number of failing devices
    pub failed: usize,
    /// Number of skipped devices
    pub skipped: usize,
    /// Whether the batch was cancelled before completing
    pub cancelled: bool,
    /// Per-device entries in request order
    pub entries: Vec<EntryOutput>,
    /// Summary line
    pub summary: String,
}

/// One device's line in the output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryOutput {
    /// Device id
    pub device_id: String,
    /// pass, fail, or skipped
    pub status: String,
    /// Failure or skip details
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<DetailOutput>,
}

/// A single failed rule or skip reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailOutput {
    /// Rule id, or "skip" for skipped entries
    pub code: String,
    /// Severity label
    pub severity: String,
    /// Human-readable message
    pub message: String,
}

impl BatchOutput {
    /// Create output from a batch result
    pub fn from_result(result: &BatchResult) -> Self {
        let entries: Vec<_> = result.entries.iter().map(EntryOutput::from_entry).collect();

        let summary = if result.cancelled {
            format!(
                "Batch cancelled after {} device(s): {} passed, {} failed, {} skipped",
                entries.len(),
                result.passed,
                result.failed,
                result.skipped
            )
        } else if result.failed == 0 && result.skipped == 0 {
            format!("All {} device(s) passed validation", result.passed)
        } else {
            format!(
                "{} passed, {} failed, {} skipped",
                result.passed, result.failed, result.skipped
            )
        };

        Self {
            passed: result.passed,
            failed: result.failed,
            skipped: result.skipped,
            cancelled: result.cancelled,
            entries,
            summary,
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => self.render_json(),
            OutputFormat::Yaml => self.render_yaml(),
            OutputFormat::Table => self.render_table(),
        }
    }

    fn render_json(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ValidationError::Serialization(e.to_string()))?;
        println!("{}", json);
        Ok(())
    }

    fn render_yaml(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ValidationError::Serialization(e.to_string()))?;
        println!("{}", yaml);
        Ok(())
    }

    fn render_table(&self) -> Result<()> {
        let mut stdout = io::stdout();

        writeln!(stdout).ok();
        writeln!(stdout, "{}", "Validation Results".cyan().bold()).ok();
        writeln!(stdout, "{}", "=".repeat(60)).ok();
        writeln!(stdout).ok();

        for entry in &self.entries {
            let status = match entry.status.as_str() {
                "pass" => "PASS".green().bold(),
                "fail" => "FAIL".red().bold(),
                _ => "SKIP".yellow().bold(),
            };
            writeln!(stdout, "{} {}", status, entry.device_id.bold()).ok();
            for detail in &entry.details {
                let icon = match detail.severity.as_str() {
                    "error" => "x".red(),
                    "warning" => "!".yellow(),
                    _ => "-".white(),
                };
                writeln!(
                    stdout,
                    "  {} [{}] {}",
                    icon,
                    detail.code.dimmed(),
                    detail.message
                )
                .ok();
            }
        }

        writeln!(stdout).ok();
        let ok = self.failed == 0 && self.skipped == 0 && !self.cancelled;
        let icon = if ok { "+".green() } else { "x".red() };
        writeln!(stdout, "{} {}", icon, self.summary).ok();

        stdout.flush().ok();
        Ok(())
    }
}

impl EntryOutput {
    /// Create from a batch entry
    pub fn from_entry(entry: &BatchEntry) -> Self {
        match entry {
            BatchEntry::Verdict { verdict } => {
                let details = verdict
                    .failures()
                    .map(|outcome| DetailOutput {
                        code: outcome.rule_id.clone(),
                        severity: outcome.severity.to_string(),
                        message: outcome
                            .message
                            .clone()
                            .unwrap_or_else(|| "rule failed".to_string()),
                    })
                    .collect();
                Self {
                    device_id: verdict.device_id.clone(),
                    status: verdict.status.to_string(),
                    details,
                }
            }
            BatchEntry::Skipped { device_id, reason } => Self {
                device_id: device_id.clone(),
                status: "skipped".to_string(),
                details: vec![DetailOutput {
                    code: "skip".to_string(),
                    severity: "warning".to_string(),
                    message: reason.clone(),
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RuleOutcome, Verdict, VerdictStatus};
    use crate::policy::Severity;
    use chrono::Utc;

    fn fail_verdict() -> Verdict {
        Verdict {
            device_id: "d1".to_string(),
            status: VerdictStatus::Fail,
            outcomes: vec![RuleOutcome {
                rule_id: "r1".to_string(),
                severity: Severity::Error,
                passed: false,
                message: Some("brightness must be between 0 and 100, got 120".to_string()),
            }],
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_batch_output_counts_and_summary() {
        let result = BatchResult {
            entries: vec![
                BatchEntry::Verdict {
                    verdict: fail_verdict(),
                },
                BatchEntry::Skipped {
                    device_id: "ghost".to_string(),
                    reason: "device not found".to_string(),
                },
            ],
            passed: 0,
            failed: 1,
            skipped: 1,
            cancelled: false,
        };
        let output = BatchOutput::from_result(&result);
        assert_eq!(output.failed, 1);
        assert_eq!(output.skipped, 1);
        assert_eq!(output.summary, "0 passed, 1 failed, 1 skipped");
        assert_eq!(output.entries[0].status, "fail");
        assert_eq!(output.entries[1].status, "skipped");
    }

    #[test]
    fn test_entry_output_carries_failure_messages() {
        let entry = BatchEntry::Verdict {
            verdict: fail_verdict(),
        };
        let output = EntryOutput::from_entry(&entry);
        assert_eq!(output.details.len(), 1);
        assert_eq!(output.details[0].code, "r1");
        assert!(output.details[0].message.contains("brightness"));
    }

    #[test]
    fn test_cancelled_summary() {
        let result = BatchResult {
            entries: vec![],
            passed: 0,
            failed: 0,
            skipped: 0,
            cancelled: true,
        };
        let output = BatchOutput::from_result(&result);
        assert!(output.summary.contains("cancelled"));
    }
}
