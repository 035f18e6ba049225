//! Device descriptors
//!
//! A descriptor is the canonical record of a device's identity and reported
//! configuration: a stable id, a type string that selects the applicable
//! policy rules, and a flat map of typed attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::value::AttrValue;

/// Canonical device record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Unique device identifier
    #[serde(rename = "id")]
    pub device_id: String,

    /// Device type, selects applicable policy rules
    #[serde(rename = "type")]
    pub device_type: String,

    /// Flat attribute map keyed by field path
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl DeviceDescriptor {
    /// Create a descriptor with an empty attribute map
    pub fn new(device_id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: device_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute (builder style)
    pub fn with_attribute(mut self, path: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(path.into(), value);
        self
    }

    /// Resolve a field path against the attribute map
    pub fn attribute(&self, path: &str) -> Option<&AttrValue> {
        self.attributes.get(path)
    }

    /// Build a descriptor from a device document.
    ///
    /// Accepts both the canonical shape (`id`, `type`, `attributes`) and the
    /// flat fleet-export shape where `room`, `name`, `status` sit at the top
    /// level and type-specific settings live under a `parameters` object.
    /// In the latter case everything is folded into the attribute map.
    pub fn from_document(doc: &serde_json::Value) -> Result<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            ValidationError::InvalidInput("device document must be an object".to_string())
        })?;

        let device_id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ValidationError::InvalidInput("device document missing string 'id'".to_string())
            })?
            .to_string();

        let device_type = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "device '{}' missing string 'type'",
                    device_id
                ))
            })?
            .to_string();

        let mut attributes = BTreeMap::new();

        if let Some(attrs) = obj.get("attributes") {
            // Canonical shape
            let attrs = attrs.as_object().ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "device '{}': 'attributes' must be an object",
                    device_id
                ))
            })?;
            for (key, raw) in attrs {
                let value = AttrValue::from_json(raw).ok_or_else(|| {
                    ValidationError::InvalidInput(format!(
                        "device '{}': attribute '{}' must be a scalar or list",
                        device_id, key
                    ))
                })?;
                attributes.insert(key.clone(), value);
            }
        } else {
            for (key, raw) in obj {
                match key.as_str() {
                    "id" | "type" => {}
                    "parameters" => {
                        let params = raw.as_object().ok_or_else(|| {
                            ValidationError::InvalidInput(format!(
                                "device '{}': 'parameters' must be an object",
                                device_id
                            ))
                        })?;
                        for (name, param) in params {
                            let value = AttrValue::from_json(param).ok_or_else(|| {
                                ValidationError::InvalidInput(format!(
                                    "device '{}': parameter '{}' must be a scalar or list",
                                    device_id, name
                                ))
                            })?;
                            attributes.insert(name.clone(), value);
                        }
                    }
                    _ => {
                        let value = AttrValue::from_json(raw).ok_or_else(|| {
                            ValidationError::InvalidInput(format!(
                                "device '{}': field '{}' must be a scalar or list",
                                device_id, key
                            ))
                        })?;
                        attributes.insert(key.clone(), value);
                    }
                }
            }
        }

        Ok(Self {
            device_id,
            device_type,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_canonical_document() {
        let doc = serde_json::json!({
            "id": "d1",
            "type": "sensor",
            "attributes": {"firmwareVersion": "2.1", "battery_level": 80}
        });
        let descriptor = DeviceDescriptor::from_document(&doc).unwrap();
        assert_eq!(descriptor.device_id, "d1");
        assert_eq!(descriptor.device_type, "sensor");
        assert_eq!(
            descriptor.attribute("firmwareVersion"),
            Some(&AttrValue::String("2.1".to_string()))
        );
        assert_eq!(
            descriptor.attribute("battery_level"),
            Some(&AttrValue::Integer(80))
        );
    }

    #[test]
    fn test_from_fleet_export_document() {
        let doc = serde_json::json!({
            "id": "lock-1",
            "type": "door_lock",
            "room": "entrance",
            "name": "Front door",
            "status": "locked",
            "parameters": {"auto_lock_enabled": true, "battery_level": 92}
        });
        let descriptor = DeviceDescriptor::from_document(&doc).unwrap();
        assert_eq!(
            descriptor.attribute("status"),
            Some(&AttrValue::String("locked".to_string()))
        );
        assert_eq!(
            descriptor.attribute("auto_lock_enabled"),
            Some(&AttrValue::Bool(true))
        );
        assert_eq!(
            descriptor.attribute("battery_level"),
            Some(&AttrValue::Integer(92))
        );
        // Parameters are flattened, the wrapper key does not survive
        assert!(descriptor.attribute("parameters").is_none());
    }

    #[test]
    fn test_missing_identity_fields() {
        let err = DeviceDescriptor::from_document(&serde_json::json!({"type": "light"}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInput(_)));

        let err = DeviceDescriptor::from_document(&serde_json::json!({"id": "d1"})).unwrap_err();
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn test_nested_objects_rejected() {
        let doc = serde_json::json!({
            "id": "d1",
            "type": "light",
            "settings": {"nested": true}
        });
        assert!(DeviceDescriptor::from_document(&doc).is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_renamed_keys() {
        let descriptor = DeviceDescriptor::new("d1", "curtain")
            .with_attribute("position", AttrValue::Integer(40));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["id"], "d1");
        assert_eq!(json["type"], "curtain");
        let back: DeviceDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }
}
