//! Device registry
//!
//! Holds canonical device descriptors keyed by id, in insertion order.
//! Readers never see the registry directly: they take a [`RegistrySnapshot`],
//! a point-in-time copy with structural sharing, so concurrent upserts can
//! never tear an in-flight validation batch.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::device::DeviceDescriptor;
use crate::error::{Result, ValidationError};
use crate::format::{self, DocFormat};

/// Mutable registry of device descriptors
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Arc<DeviceDescriptor>>,
    index: HashMap<String, usize>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a descriptor.
    ///
    /// Overwriting is allowed as long as the immutable identity holds: a
    /// descriptor with the same id but a different `device_type` is rejected
    /// with [`ValidationError::DuplicateDevice`] and the registry is left
    /// unchanged. Changing a device's type requires an explicit `remove`.
    pub fn upsert(&mut self, descriptor: DeviceDescriptor) -> Result<()> {
        if let Some(&slot) = self.index.get(&descriptor.device_id) {
            let existing = &self.devices[slot];
            if existing.device_type != descriptor.device_type {
                return Err(ValidationError::DuplicateDevice(format!(
                    "'{}' already registered with type '{}', cannot overwrite with type '{}'",
                    descriptor.device_id, existing.device_type, descriptor.device_type
                )));
            }
            debug!(device_id = %descriptor.device_id, "overwriting descriptor");
            self.devices[slot] = Arc::new(descriptor);
        } else {
            debug!(device_id = %descriptor.device_id, device_type = %descriptor.device_type, "registering descriptor");
            self.index
                .insert(descriptor.device_id.clone(), self.devices.len());
            self.devices.push(Arc::new(descriptor));
        }
        Ok(())
    }

    /// Remove a descriptor by id
    pub fn remove(&mut self, device_id: &str) -> Result<Arc<DeviceDescriptor>> {
        let slot = self
            .index
            .remove(device_id)
            .ok_or_else(|| ValidationError::not_found(device_id))?;
        let removed = self.devices.remove(slot);
        // Positions after the removed slot shift down by one
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Ok(removed)
    }

    /// Look up a descriptor by id
    pub fn get(&self, device_id: &str) -> Result<Arc<DeviceDescriptor>> {
        self.index
            .get(device_id)
            .map(|&slot| Arc::clone(&self.devices[slot]))
            .ok_or_else(|| ValidationError::not_found(device_id))
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Registered device ids, in insertion order
    pub fn device_ids(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.device_id.clone()).collect()
    }

    /// Take a point-in-time snapshot.
    ///
    /// The snapshot shares descriptors with the registry via `Arc`; later
    /// `upsert`/`remove` calls replace entries instead of mutating them, so
    /// the snapshot's view never changes.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            devices: self.devices.clone(),
            index: self.index.clone(),
        }
    }

    /// Load descriptors from a source path.
    ///
    /// A file is parsed as a single document holding one descriptor or an
    /// array of descriptors (the fleet-export `data.json` variant); a
    /// directory is scanned non-recursively for files with a recognized
    /// extension, in sorted order.
    pub fn load_source(&mut self, path: &Path) -> Result<usize> {
        let descriptors = if path.is_dir() {
            load_dir(path)?
        } else {
            load_file(path)?
        };
        let count = descriptors.len();
        for descriptor in descriptors {
            self.upsert(descriptor)?;
        }
        info!(source = %path.display(), count, "loaded device descriptors");
        Ok(count)
    }

    /// Build a registry from a source path
    pub fn from_source(path: &Path) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_source(path)?;
        Ok(registry)
    }
}

/// Read-only, point-in-time view of the registry
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    devices: Vec<Arc<DeviceDescriptor>>,
    index: HashMap<String, usize>,
}

impl RegistrySnapshot {
    /// Look up a descriptor by id
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceDescriptor>> {
        self.index
            .get(device_id)
            .map(|&slot| Arc::clone(&self.devices[slot]))
    }

    /// Iterate descriptors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceDescriptor>> {
        self.devices.iter()
    }

    /// Device ids in insertion order
    pub fn device_ids(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.device_id.clone()).collect()
    }

    /// Number of devices in the snapshot
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn load_file(path: &Path) -> Result<Vec<DeviceDescriptor>> {
    let doc = format::read_document(path)?;
    documents_from_value(&doc)
}

fn load_dir(path: &Path) -> Result<Vec<DeviceDescriptor>> {
    let mut entries: Vec<_> = std::fs::read_dir(path)
        .map_err(|e| {
            ValidationError::File(format!("Failed to read directory '{}': {}", path.display(), e))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && DocFormat::is_supported(p))
        .collect();
    entries.sort();

    let mut descriptors = Vec::new();
    for file in entries {
        descriptors.extend(load_file(&file)?);
    }
    Ok(descriptors)
}

fn documents_from_value(doc: &serde_json::Value) -> Result<Vec<DeviceDescriptor>> {
    match doc {
        serde_json::Value::Array(items) => {
            items.iter().map(DeviceDescriptor::from_document).collect()
        }
        serde_json::Value::Object(_) => Ok(vec![DeviceDescriptor::from_document(doc)?]),
        _ => Err(ValidationError::InvalidInput(
            "device source must be an object or an array of objects".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrValue;
    use std::io::Write;

    fn light(id: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(id, "light").with_attribute("brightness", AttrValue::Integer(50))
    }

    #[test]
    fn test_upsert_and_get() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(light("l1")).unwrap();
        let fetched = registry.get("l1").unwrap();
        assert_eq!(fetched.device_type, "light");
        assert!(matches!(
            registry.get("missing").unwrap_err(),
            ValidationError::NotFound(_)
        ));
    }

    #[test]
    fn test_upsert_overwrites_same_type() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(light("l1")).unwrap();
        let replacement =
            DeviceDescriptor::new("l1", "light").with_attribute("brightness", AttrValue::Integer(80));
        registry.upsert(replacement).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("l1").unwrap().attribute("brightness"),
            Some(&AttrValue::Integer(80))
        );
    }

    #[test]
    fn test_upsert_conflicting_type_rejected() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(light("l1")).unwrap();
        let err = registry
            .upsert(DeviceDescriptor::new("l1", "curtain"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateDevice(_)));
        // Registry unchanged on failure
        assert_eq!(registry.get("l1").unwrap().device_type, "light");
    }

    #[test]
    fn test_remove_then_reregister_with_new_type() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(light("l1")).unwrap();
        registry.upsert(light("l2")).unwrap();
        registry.remove("l1").unwrap();
        registry.upsert(DeviceDescriptor::new("l1", "curtain")).unwrap();
        assert_eq!(registry.get("l1").unwrap().device_type, "curtain");
        // l2 still reachable after index shift
        assert_eq!(registry.get("l2").unwrap().device_id, "l2");
    }

    #[test]
    fn test_snapshot_isolated_from_mutation() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(light("l1")).unwrap();
        let snapshot = registry.snapshot();

        registry
            .upsert(
                DeviceDescriptor::new("l1", "light")
                    .with_attribute("brightness", AttrValue::Integer(5)),
            )
            .unwrap();
        registry.upsert(light("l2")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("l1").unwrap().attribute("brightness"),
            Some(&AttrValue::Integer(50))
        );
        assert!(snapshot.get("l2").is_none());
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let mut registry = DeviceRegistry::new();
        for id in ["c", "a", "b"] {
            registry.upsert(light(id)).unwrap();
        }
        assert_eq!(registry.snapshot().device_ids(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_load_single_file_array() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[
                {{"id": "l1", "type": "light", "status": "on", "parameters": {{"brightness": 70}}}},
                {{"id": "k1", "type": "door_lock", "status": "locked", "parameters": {{"battery_level": 50}}}}
            ]"#
        )
        .unwrap();

        let registry = DeviceRegistry::from_source(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("l1").unwrap().attribute("brightness"),
            Some(&AttrValue::Integer(70))
        );
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"id": "l1", "type": "light", "status": "on"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "id: c1\ntype: curtain\nstatus: open\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = DeviceRegistry::from_source(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.device_ids(), vec!["l1", "c1"]);
    }
}
