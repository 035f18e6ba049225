//! Built-in smart-home policy set
//!
//! Validation rules for the standard smart-home fleet: lights, water
//! heaters, air conditioners, door locks, and curtains. Numeric bounds can
//! be overridden through environment variables; the defaults match the
//! fleet's shipped firmware limits.

use super::{Constraint, DeviceTypeSelector, PolicyRule, PolicySet, RegexPattern, Severity, TypeTag};
use crate::error::Result;

/// Device types the built-in policy set knows about
pub const DEVICE_TYPES: [&str; 5] = [
    "light",
    "water_heater",
    "air_conditioner",
    "door_lock",
    "curtain",
];

/// Hours and minutes with optional seconds, 24-hour clock
pub const TIME_PATTERN: &str = "^([01][0-9]|2[0-3]):([0-5][0-9])(:[0-5][0-9])?$";
/// Hex RGB color, short or long form
pub const COLOR_PATTERN: &str = "^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$";

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Numeric bounds for the built-in rules, resolved once at construction
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinBounds {
    pub min_water_temp: f64,
    pub max_water_temp: f64,
    pub min_ac_temp: f64,
    pub max_ac_temp: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
    pub min_position: f64,
    pub max_position: f64,
    pub min_battery: f64,
    pub max_battery: f64,
}

impl Default for BuiltinBounds {
    fn default() -> Self {
        Self {
            min_water_temp: 49.0,
            max_water_temp: 60.0,
            min_ac_temp: 16.0,
            max_ac_temp: 30.0,
            min_brightness: 0.0,
            max_brightness: 100.0,
            min_position: 0.0,
            max_position: 100.0,
            min_battery: 0.0,
            max_battery: 100.0,
        }
    }
}

impl BuiltinBounds {
    /// Resolve bounds from the environment, falling back to the defaults
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            min_water_temp: env_f64("MIN_WATER_TEMP", d.min_water_temp),
            max_water_temp: env_f64("MAX_WATER_TEMP", d.max_water_temp),
            min_ac_temp: env_f64("MIN_AC_TEMP", d.min_ac_temp),
            max_ac_temp: env_f64("MAX_AC_TEMP", d.max_ac_temp),
            min_brightness: env_f64("MIN_BRIGHTNESS", d.min_brightness),
            max_brightness: env_f64("MAX_BRIGHTNESS", d.max_brightness),
            min_position: env_f64("MIN_POSITION", d.min_position),
            max_position: env_f64("MAX_POSITION", d.max_position),
            min_battery: env_f64("MIN_BATTERY", d.min_battery),
            max_battery: env_f64("MAX_BATTERY", d.max_battery),
        }
    }
}

fn rule(
    rule_id: &str,
    applies_to: DeviceTypeSelector,
    field_path: &str,
    constraint: Constraint,
    severity: Severity,
) -> PolicyRule {
    PolicyRule {
        rule_id: rule_id.to_string(),
        applies_to,
        field_path: field_path.to_string(),
        constraint,
        severity,
    }
}

fn for_type(device_type: &str) -> DeviceTypeSelector {
    DeviceTypeSelector::Exact(device_type.to_string())
}

fn range(min: f64, max: f64) -> Constraint {
    Constraint::Range {
        min: Some(min),
        max: Some(max),
    }
}

fn allowed(values: &[&str]) -> Constraint {
    Constraint::Enum {
        allowed: values.iter().map(|v| v.to_string()).collect(),
    }
}

/// Type-specific parameters each device type may carry
const TYPE_PARAMETERS: [(&str, &[&str]); 5] = [
    ("light", &["brightness", "color", "is_dimmable", "dynamic_color"]),
    (
        "water_heater",
        &[
            "temperature",
            "target_temperature",
            "is_heating",
            "timer_enabled",
            "scheduled_on",
            "scheduled_off",
        ],
    ),
    ("air_conditioner", &["temperature", "mode", "fan_speed", "swing"]),
    ("door_lock", &["auto_lock_enabled", "battery_level"]),
    ("curtain", &["position"]),
];

fn allowed_fields(params: &[&str]) -> Constraint {
    let mut fields: Vec<String> = ["room", "name", "status"]
        .iter()
        .map(|f| f.to_string())
        .collect();
    fields.extend(params.iter().map(|p| p.to_string()));
    Constraint::Fields { allowed: fields }
}

/// Build the smart-home policy set with explicit bounds
pub fn smart_home_policy_set_with(bounds: &BuiltinBounds) -> Result<PolicySet> {
    let time = || -> Result<Constraint> {
        Ok(Constraint::Regex {
            pattern: RegexPattern::new(TIME_PATTERN)?,
        })
    };
    let color = Constraint::Regex {
        pattern: RegexPattern::new(COLOR_PATTERN)?,
    };

    let mut rules = Vec::new();

    // Structural rules for every device type
    for field in ["room", "name", "status"] {
        rules.push(rule(
            &format!("any-{}-present", field),
            DeviceTypeSelector::Any,
            field,
            Constraint::Presence,
            Severity::Error,
        ));
    }

    // Vocabulary: only the known device types, only their known parameters
    rules.push(rule(
        "any-device-type",
        DeviceTypeSelector::Any,
        "type",
        Constraint::DeviceType {
            allowed: DEVICE_TYPES.iter().map(|t| t.to_string()).collect(),
        },
        Severity::Error,
    ));
    for (device_type, params) in TYPE_PARAMETERS {
        rules.push(rule(
            &format!("{}-allowed-fields", device_type),
            for_type(device_type),
            "attributes",
            allowed_fields(params),
            Severity::Error,
        ));
    }

    // Per-type status vocabulary
    rules.push(rule(
        "door_lock-status",
        for_type("door_lock"),
        "status",
        allowed(&["locked", "unlocked"]),
        Severity::Error,
    ));
    rules.push(rule(
        "curtain-status",
        for_type("curtain"),
        "status",
        allowed(&["open", "closed"]),
        Severity::Error,
    ));
    for device_type in ["light", "water_heater", "air_conditioner"] {
        rules.push(rule(
            &format!("{}-status", device_type),
            for_type(device_type),
            "status",
            allowed(&["on", "off"]),
            Severity::Error,
        ));
    }

    // Water heater
    rules.push(rule(
        "water_heater-temperature-type",
        for_type("water_heater"),
        "temperature",
        Constraint::Type {
            expected: TypeTag::Number,
        },
        Severity::Error,
    ));
    rules.push(rule(
        "water_heater-target-temperature",
        for_type("water_heater"),
        "target_temperature",
        range(bounds.min_water_temp, bounds.max_water_temp),
        Severity::Error,
    ));
    rules.push(rule(
        "water_heater-is-heating-type",
        for_type("water_heater"),
        "is_heating",
        Constraint::Type {
            expected: TypeTag::Bool,
        },
        Severity::Error,
    ));
    rules.push(rule(
        "water_heater-timer-enabled-type",
        for_type("water_heater"),
        "timer_enabled",
        Constraint::Type {
            expected: TypeTag::Bool,
        },
        Severity::Error,
    ));
    rules.push(rule(
        "water_heater-scheduled-on-time",
        for_type("water_heater"),
        "scheduled_on",
        time()?,
        Severity::Error,
    ));
    rules.push(rule(
        "water_heater-scheduled-off-time",
        for_type("water_heater"),
        "scheduled_off",
        time()?,
        Severity::Error,
    ));

    // Light
    rules.push(rule(
        "light-brightness-range",
        for_type("light"),
        "brightness",
        range(bounds.min_brightness, bounds.max_brightness),
        Severity::Error,
    ));
    rules.push(rule(
        "light-color-format",
        for_type("light"),
        "color",
        color,
        Severity::Error,
    ));
    rules.push(rule(
        "light-is-dimmable-type",
        for_type("light"),
        "is_dimmable",
        Constraint::Type {
            expected: TypeTag::Bool,
        },
        Severity::Error,
    ));
    rules.push(rule(
        "light-dynamic-color-type",
        for_type("light"),
        "dynamic_color",
        Constraint::Type {
            expected: TypeTag::Bool,
        },
        Severity::Error,
    ));

    // Air conditioner
    rules.push(rule(
        "air_conditioner-temperature-range",
        for_type("air_conditioner"),
        "temperature",
        range(bounds.min_ac_temp, bounds.max_ac_temp),
        Severity::Error,
    ));
    rules.push(rule(
        "air_conditioner-mode",
        for_type("air_conditioner"),
        "mode",
        allowed(&["cool", "heat", "fan"]),
        Severity::Error,
    ));
    rules.push(rule(
        "air_conditioner-fan-speed",
        for_type("air_conditioner"),
        "fan_speed",
        allowed(&["off", "low", "medium", "high"]),
        Severity::Error,
    ));
    rules.push(rule(
        "air_conditioner-swing",
        for_type("air_conditioner"),
        "swing",
        allowed(&["off", "on", "auto"]),
        Severity::Error,
    ));

    // Door lock
    rules.push(rule(
        "door_lock-auto-lock-type",
        for_type("door_lock"),
        "auto_lock_enabled",
        Constraint::Type {
            expected: TypeTag::Bool,
        },
        Severity::Error,
    ));
    rules.push(rule(
        "door_lock-battery-range",
        for_type("door_lock"),
        "battery_level",
        range(bounds.min_battery, bounds.max_battery),
        Severity::Error,
    ));
    rules.push(rule(
        "door_lock-battery-low",
        for_type("door_lock"),
        "battery_level",
        range(20.0, bounds.max_battery),
        Severity::Warning,
    ));

    // Curtain
    rules.push(rule(
        "curtain-position-range",
        for_type("curtain"),
        "position",
        range(bounds.min_position, bounds.max_position),
        Severity::Error,
    ));

    PolicySet::from_rules(rules)
}

/// Build the smart-home policy set with environment-resolved bounds
pub fn smart_home_policy_set() -> Result<PolicySet> {
    smart_home_policy_set_with(&BuiltinBounds::from_env())
}
