//! Arm geometry configuration
//!
//! Named link lengths for the yaw + pitch arm, all defaulted. The record is
//! what clients send in the `config` field of a request; parsing is lenient so
//! a bad value degrades to its default instead of failing the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Link lengths and actuator limits for the arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArmConfig {
    /// Vertical column from the yaw joint to the shoulder pivot
    pub base_length: f64,

    /// Lateral offset of the shoulder bracket (applied along -X)
    pub shoulder_length: f64,

    /// Upper arm, shoulder bracket to elbow bracket (+Y)
    pub ankle_length: f64,

    /// Elbow bracket offset back toward the arm plane (+X)
    pub ankle2_length: f64,

    /// Forearm, elbow pivot to the end of the arm (+Y)
    pub forearm_length: f64,

    /// Symmetric mechanical limit of the forearm actuator in degrees
    pub forearm_limit_deg: f64,

    /// Optional wrist stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrist: Option<WristConfig>,
}

/// Extra stage appended after the forearm: a fixed wrist segment, a pitch
/// joint and a fixed hand segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WristConfig {
    pub wrist_length: f64,
    pub hand_length: f64,

    /// Symmetric mechanical limit of the wrist actuator in degrees.
    /// Narrower than the solver bound of the joint.
    pub wrist_limit_deg: f64,
}

impl ArmConfig {
    pub const DEFAULT_BASE_LENGTH: f64 = 3.0;
    pub const DEFAULT_SHOULDER_LENGTH: f64 = 4.0;
    pub const DEFAULT_ANKLE_LENGTH: f64 = 10.0;
    pub const DEFAULT_ANKLE2_LENGTH: f64 = 4.0;
    pub const DEFAULT_FOREARM_LENGTH: f64 = 10.0;
    pub const DEFAULT_FOREARM_LIMIT_DEG: f64 = 135.0;

    /// Default arm with the wrist stage enabled
    pub fn with_wrist() -> Self {
        Self {
            wrist: Some(WristConfig::default()),
            ..Self::default()
        }
    }

    /// Build a configuration from an untyped JSON record.
    ///
    /// Numbers and numeric strings are accepted; anything else (including a
    /// missing key or a non-object record) falls back to the default. The
    /// wrist stage is enabled by `enableWrist: true`, by supplying one of its
    /// lengths, or by a nested `wrist` record as [`ArmConfig`] serializes it.
    /// Flat wrist keys win over the nested record.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let nested = &value["wrist"];

        let wrist_requested = value["enableWrist"].as_bool().unwrap_or(false)
            || !value["wristLength"].is_null()
            || !value["handLength"].is_null()
            || nested.is_object();

        let wrist = if wrist_requested {
            let wrist_defaults = WristConfig::default();
            let wrist_number = |key: &str, default: f64| number_or(value, key, number_or(nested, key, default));
            Some(WristConfig {
                wrist_length: wrist_number("wristLength", wrist_defaults.wrist_length),
                hand_length: wrist_number("handLength", wrist_defaults.hand_length),
                wrist_limit_deg: wrist_number("wristLimitDeg", wrist_defaults.wrist_limit_deg),
            })
        } else {
            None
        };

        Self {
            base_length: number_or(value, "baseLength", defaults.base_length),
            shoulder_length: number_or(value, "shoulderLength", defaults.shoulder_length),
            ankle_length: number_or(value, "ankleLength", defaults.ankle_length),
            ankle2_length: number_or(value, "ankle2Length", defaults.ankle2_length),
            forearm_length: number_or(value, "forearmLength", defaults.forearm_length),
            forearm_limit_deg: number_or(value, "forearmLimitDeg", defaults.forearm_limit_deg),
            wrist,
        }
    }

    pub fn has_wrist(&self) -> bool {
        self.wrist.is_some()
    }
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            base_length: Self::DEFAULT_BASE_LENGTH,
            shoulder_length: Self::DEFAULT_SHOULDER_LENGTH,
            ankle_length: Self::DEFAULT_ANKLE_LENGTH,
            ankle2_length: Self::DEFAULT_ANKLE2_LENGTH,
            forearm_length: Self::DEFAULT_FOREARM_LENGTH,
            forearm_limit_deg: Self::DEFAULT_FOREARM_LIMIT_DEG,
            wrist: None,
        }
    }
}

impl Default for WristConfig {
    fn default() -> Self {
        Self {
            wrist_length: 2.0,
            hand_length: 3.0,
            wrist_limit_deg: 120.0,
        }
    }
}

/// Read `key` as a finite number, accepting numeric strings.
fn number_or(value: &Value, key: &str, default: f64) -> f64 {
    let parsed = match &value[key] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = ArmConfig::from_value(&Value::Null);
        assert_eq!(config, ArmConfig::default());
        assert!(!config.has_wrist());
    }

    #[test]
    fn test_lenient_lengths() {
        let config = ArmConfig::from_value(&json!({
            "baseLength": 5,
            "shoulderLength": "2.5",
            "ankleLength": "long",
            "forearmLength": [1, 2]
        }));

        assert!((config.base_length - 5.0).abs() < 1e-12);
        assert!((config.shoulder_length - 2.5).abs() < 1e-12);
        assert!((config.ankle_length - ArmConfig::DEFAULT_ANKLE_LENGTH).abs() < 1e-12);
        assert!((config.ankle2_length - ArmConfig::DEFAULT_ANKLE2_LENGTH).abs() < 1e-12);
        assert!((config.forearm_length - ArmConfig::DEFAULT_FOREARM_LENGTH).abs() < 1e-12);
    }

    #[test]
    fn test_wrist_enabled_by_length() {
        let config = ArmConfig::from_value(&json!({ "handLength": 6 }));
        let wrist = config.wrist.expect("wrist stage should be enabled");
        assert!((wrist.hand_length - 6.0).abs() < 1e-12);
        assert!((wrist.wrist_length - WristConfig::default().wrist_length).abs() < 1e-12);

        let config = ArmConfig::from_value(&json!({ "enableWrist": true }));
        assert_eq!(config.wrist, Some(WristConfig::default()));
    }

    #[test]
    fn test_serialized_config_reads_back() {
        let config = ArmConfig {
            forearm_length: 12.0,
            wrist: Some(WristConfig {
                wrist_length: 1.5,
                hand_length: 4.0,
                wrist_limit_deg: 100.0,
            }),
            ..ArmConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(ArmConfig::from_value(&json), config);

        let json = serde_json::to_value(ArmConfig::default()).unwrap();
        assert_eq!(ArmConfig::from_value(&json), ArmConfig::default());

        // flat keys override the nested record
        let config = ArmConfig::from_value(&json!({ "wrist": { "handLength": 5 }, "handLength": 6 }));
        assert!((config.wrist.unwrap().hand_length - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_names_are_camel_case() {
        let json = serde_json::to_value(ArmConfig::with_wrist()).unwrap();
        assert_eq!(json["ankle2Length"], json!(4.0));
        assert_eq!(json["wrist"]["wristLimitDeg"], json!(120.0));

        let parsed: ArmConfig = serde_json::from_value(json!({ "forearmLength": 7.0 })).unwrap();
        assert!((parsed.forearm_length - 7.0).abs() < 1e-12);
        assert!((parsed.base_length - ArmConfig::DEFAULT_BASE_LENGTH).abs() < 1e-12);
    }
}
