//! Client request parsing.

use arm_ik::{ArmConfig, IkError, SampleSpec};
use serde_json::Value;

/// One trajectory request
#[derive(Debug, Clone, PartialEq)]
pub struct IkRequest {
    pub target: [f64; 3],
    /// When present, a trajectory from here to `target` is produced
    pub origin: Option<[f64; 3]>,
    /// Raw fraction list, normalized by [`IkRequest::sample_spec`]
    pub fractions: Option<Vec<f64>>,
    /// Total pose count including both endpoints
    pub step_count: Option<u64>,
    pub config: ArmConfig,
}

impl IkRequest {
    pub fn from_json(input: &str) -> Result<Self, IkError> {
        let value: Value = serde_json::from_str(input).map_err(|e| IkError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Parse an already decoded payload.
    ///
    /// Only `target` is mandatory. A malformed `origin` is ignored, fraction
    /// entries that are not numbers are skipped and `config` is read leniently.
    pub fn from_value(value: &Value) -> Result<Self, IkError> {
        let target = point(&value["target"]).ok_or(IkError::InvalidTarget)?;
        let origin = point(&value["origin"]);

        let fractions = value["fractions"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect());

        let step_count = match &value["stepCount"] {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            }),
            _ => None,
        };

        Ok(Self {
            target,
            origin,
            fractions,
            step_count,
            config: ArmConfig::from_value(&value["config"]),
        })
    }

    /// Sampling for the trajectory interior.
    ///
    /// A step count greater than one wins over `fractions` and is clamped to
    /// [`SampleSpec::MAX_STEPS`]; otherwise the fraction list is normalized,
    /// falling back to the default fractions.
    pub fn sample_spec(&self) -> SampleSpec {
        if let Some(spec) = self.step_count.and_then(SampleSpec::steps) {
            return spec;
        }
        match &self.fractions {
            Some(raw) => SampleSpec::fractions(raw),
            None => SampleSpec::default(),
        }
    }
}

/// Three finite numbers, or nothing
fn point(value: &Value) -> Option<[f64; 3]> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().filter(|v| v.is_finite())?;
    }
    Some(out)
}
