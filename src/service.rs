//! Batch validation service
//!
//! Drives the engine over a registry snapshot. Batch items run as
//! independent tasks; an unknown device id skips that item and never aborts
//! its neighbors, and results come back in request order regardless of task
//! completion order. A cooperative cancel flag stops the batch between
//! items, returning whatever prefix was already processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::engine::{self, Verdict};
use crate::error::Result;
use crate::policy::PolicySet;
use crate::registry::RegistrySnapshot;

/// Cooperative cancellation handle for a batch
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One slot in a batch result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BatchEntry {
    /// The device was found and evaluated
    Verdict { verdict: Verdict },
    /// The device could not be evaluated
    Skipped { device_id: String, reason: String },
}

impl BatchEntry {
    /// Device id the entry refers to
    pub fn device_id(&self) -> &str {
        match self {
            BatchEntry::Verdict { verdict } => &verdict.device_id,
            BatchEntry::Skipped { device_id, .. } => device_id,
        }
    }

    /// The verdict, if the entry carries one
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            BatchEntry::Verdict { verdict } => Some(verdict),
            BatchEntry::Skipped { .. } => None,
        }
    }
}

/// Outcome of a validation batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Entries in request order
    pub entries: Vec<BatchEntry>,
    /// Count of passing verdicts
    pub passed: usize,
    /// Count of failing verdicts
    pub failed: usize,
    /// Count of skipped items
    pub skipped: usize,
    /// Whether the batch stopped early on a cancel request
    pub cancelled: bool,
}

impl BatchResult {
    fn from_entries(entries: Vec<BatchEntry>, cancelled: bool) -> Self {
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for entry in &entries {
            match entry.verdict() {
                Some(v) if v.passed() => passed += 1,
                Some(_) => failed += 1,
                None => skipped += 1,
            }
        }
        Self {
            entries,
            passed,
            failed,
            skipped,
            cancelled,
        }
    }

    /// Whether every entry is a passing verdict
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.cancelled
    }
}

/// Validation service over a fixed registry snapshot and policy set
#[derive(Debug, Clone)]
pub struct ValidationService {
    snapshot: RegistrySnapshot,
    policies: Arc<PolicySet>,
}

impl ValidationService {
    /// Create a service over a snapshot and policy set
    pub fn new(snapshot: RegistrySnapshot, policies: Arc<PolicySet>) -> Self {
        Self { snapshot, policies }
    }

    /// The snapshot the service reads from
    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    /// Validate a single device by id.
    ///
    /// Unlike a batch item, a missing id here is an error: the caller asked
    /// about one specific device and there is no partial result to return.
    pub fn validate_single(&self, device_id: &str) -> Result<Verdict> {
        let descriptor = self
            .snapshot
            .get(device_id)
            .ok_or_else(|| crate::error::ValidationError::not_found(device_id))?;
        Ok(engine::evaluate(&descriptor, &self.policies))
    }

    /// Validate a batch of device ids, preserving request order
    pub async fn validate_batch(&self, device_ids: &[String]) -> BatchResult {
        self.validate_batch_with_cancel(device_ids, &CancelFlag::new())
            .await
    }

    /// Validate a batch with a cooperative cancel flag.
    ///
    /// The flag is checked before dispatching each item; on cancellation the
    /// already-dispatched prefix still completes and is returned with
    /// `cancelled = true`.
    pub async fn validate_batch_with_cancel(
        &self,
        device_ids: &[String],
        cancel: &CancelFlag,
    ) -> BatchResult {
        let mut slots: Vec<Option<BatchEntry>> = Vec::new();
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        for device_id in device_ids {
            if cancel.is_cancelled() {
                debug!(dispatched = slots.len(), "batch cancelled");
                cancelled = true;
                break;
            }
            let slot = slots.len();
            match self.snapshot.get(device_id) {
                Some(descriptor) => {
                    slots.push(None);
                    let policies = Arc::clone(&self.policies);
                    tasks.spawn(async move {
                        (slot, engine::evaluate(&descriptor, &policies))
                    });
                }
                None => {
                    debug!(device_id = %device_id, "skipping unknown device");
                    slots.push(Some(BatchEntry::Skipped {
                        device_id: device_id.clone(),
                        reason: "device not found".to_string(),
                    }));
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, verdict)) => {
                    slots[slot] = Some(BatchEntry::Verdict { verdict });
                }
                Err(err) => {
                    // A panicked task loses its slot index; the unfilled
                    // slot is converted below rather than aborting the batch.
                    warn!(error = %err, "validation task failed");
                }
            }
        }

        let entries = slots
            .into_iter()
            .enumerate()
            .map(|(slot, entry)| {
                entry.unwrap_or_else(|| BatchEntry::Skipped {
                    device_id: device_ids
                        .get(slot)
                        .cloned()
                        .unwrap_or_default(),
                    reason: "internal evaluation error".to_string(),
                })
            })
            .collect();

        BatchResult::from_entries(entries, cancelled)
    }

    /// Validate every device in the snapshot, in registry order
    pub async fn validate_all(&self) -> BatchResult {
        let ids = self.snapshot.device_ids();
        self.validate_batch(&ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDescriptor;
    use crate::error::ValidationError;
    use crate::policy::{Constraint, DeviceTypeSelector, PolicyRule, Severity};
    use crate::registry::DeviceRegistry;
    use crate::value::AttrValue;

    fn service(devices: Vec<DeviceDescriptor>) -> ValidationService {
        let mut registry = DeviceRegistry::new();
        for device in devices {
            registry.upsert(device).unwrap();
        }
        let policies = PolicySet::from_rules(vec![PolicyRule {
            rule_id: "status-present".to_string(),
            applies_to: DeviceTypeSelector::Any,
            field_path: "status".to_string(),
            constraint: Constraint::Presence,
            severity: Severity::Error,
        }])
        .unwrap();
        ValidationService::new(registry.snapshot(), Arc::new(policies))
    }

    fn light(id: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(id, "light")
            .with_attribute("status", AttrValue::String("on".to_string()))
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_preserves_request_order() {
        let svc = service(vec![light("a"), light("b"), light("c")]);
        let result = svc.validate_batch(&ids(&["c", "a", "b"])).await;
        let order: Vec<_> = result.entries.iter().map(|e| e.device_id()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(result.passed, 3);
        assert!(result.all_passed());
    }

    #[tokio::test]
    async fn test_unknown_id_skips_without_aborting_batch() {
        let svc = service(vec![light("a"), light("c")]);
        let result = svc.validate_batch(&ids(&["a", "ghost", "c"])).await;
        assert_eq!(result.entries.len(), 3);
        assert!(result.entries[0].verdict().is_some());
        assert!(matches!(
            &result.entries[1],
            BatchEntry::Skipped { device_id, reason }
                if device_id == "ghost" && reason.contains("not found")
        ));
        assert!(result.entries[2].verdict().is_some());
        assert_eq!(result.skipped, 1);
        assert!(!result.all_passed());
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_pre_cancelled_batch_returns_empty() {
        let svc = service(vec![light("a")]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = svc
            .validate_batch_with_cancel(&ids(&["a"]), &cancel)
            .await;
        assert!(result.entries.is_empty());
        assert!(result.cancelled);
        assert!(!result.all_passed());
    }

    #[tokio::test]
    async fn test_validate_all_follows_registry_order() {
        let svc = service(vec![light("z"), light("m"), light("a")]);
        let result = svc.validate_all().await;
        let order: Vec<_> = result.entries.iter().map(|e| e.device_id()).collect();
        assert_eq!(order, vec!["z", "m", "a"]);
    }

    #[tokio::test]
    async fn test_failing_device_does_not_poison_neighbors() {
        let bare = DeviceDescriptor::new("bare", "light");
        let svc = service(vec![light("a"), bare, light("c")]);
        let result = svc.validate_batch(&ids(&["a", "bare", "c"])).await;
        assert_eq!(result.passed, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.entries[1].verdict().unwrap().passed());
    }

    #[test]
    fn test_single_unknown_is_error() {
        let svc = service(vec![light("a")]);
        let err = svc.validate_single("ghost").unwrap_err();
        assert!(matches!(err, ValidationError::NotFound(_)));
    }

    #[test]
    fn test_single_known_device() {
        let svc = service(vec![light("a")]);
        let verdict = svc.validate_single("a").unwrap();
        assert!(verdict.passed());
    }
}
