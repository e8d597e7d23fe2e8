//! Core parameter types shared by every search strategy.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a search-space description.
///
/// All variants are configuration-time failures: they are raised before
/// any fitness evaluation is attempted.
#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("parameter '{0}' has an empty value list")]
    EmptyValues(String),

    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("parameter '{name}': min {min} exceeds max {max}")]
    InvertedBounds { name: String, min: f64, max: f64 },

    #[error("parameter '{name}': no integer lies within [{min}, {max}]")]
    EmptyIntRange { name: String, min: f64, max: f64 },

    #[error("parameter '{name}': log-uniform bounds must be positive (got min={min}, max={max})")]
    NonPositiveLogBound { name: String, min: f64, max: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid space file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A single concrete parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    /// View the value as a float regardless of kind.
    pub fn to_f64(self) -> f64 {
        match self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        if let ParamValue::Int(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_float(self) -> Option<f64> {
        if let ParamValue::Float(v) = self {
            Some(v)
        } else {
            None
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One concrete assignment of values to every tunable parameter.
///
/// Keys are unique and iteration order is deterministic (sorted by
/// name), which keeps randomized operators that walk the set
/// reproducible. Operators never mutate a set in place; crossover,
/// mutation, and sampling all return new sets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any existing value for the name.
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Whether a parameter takes integer or continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
}

/// Inclusive bound for a single tunable parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub kind: ValueKind,
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    pub fn new(name: &str, kind: ValueKind, min: f64, max: f64) -> Result<Self, SpaceError> {
        let range = Self {
            name: name.to_string(),
            kind,
            min,
            max,
        };
        range.validate()?;
        Ok(range)
    }

    /// Check the bounds. Used both by the constructor and after
    /// deserializing ranges from configuration.
    pub fn validate(&self) -> Result<(), SpaceError> {
        if self.min > self.max {
            return Err(SpaceError::InvertedBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if self.kind == ValueKind::Int && self.min.ceil() > self.max.floor() {
            return Err(SpaceError::EmptyIntRange {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Draw a uniform value within the bounds.
    pub fn sample(&self, rng: &mut StdRng) -> ParamValue {
        match self.kind {
            ValueKind::Int => {
                let lo = self.min.ceil() as i64;
                let hi = self.max.floor() as i64;
                ParamValue::Int(rng.random_range(lo..=hi))
            }
            ValueKind::Float => {
                if self.min == self.max {
                    ParamValue::Float(self.min)
                } else {
                    ParamValue::Float(rng.random_range(self.min..self.max))
                }
            }
        }
    }

    /// Clamp a raw float into the bounds, rounding for integer kinds.
    pub fn clamp_to(&self, raw: f64) -> ParamValue {
        let clamped = raw.clamp(self.min, self.max);
        match self.kind {
            ValueKind::Int => ParamValue::Int(clamped.round().clamp(self.min, self.max) as i64),
            ValueKind::Float => ParamValue::Float(clamped),
        }
    }

    /// Whether a value lies within the bounds.
    pub fn contains(&self, value: ParamValue) -> bool {
        let v = value.to_f64();
        v >= self.min && v <= self.max
    }
}

/// Reject duplicate names across a list of declared parameters.
pub(crate) fn check_unique_names<'a, I>(names: I) -> Result<(), SpaceError>
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = std::collections::BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SpaceError::DuplicateParameter(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_parameter_set_is_ordered() {
        let set = ParameterSet::new()
            .with("zeta", ParamValue::Int(1))
            .with("alpha", ParamValue::Int(2));

        let names: Vec<_> = set.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_parameter_set_display() {
        let set = ParameterSet::new()
            .with("lookback", ParamValue::Int(20))
            .with("threshold", ParamValue::Float(0.5));
        assert_eq!(set.to_string(), "lookback=20, threshold=0.5");
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let result = ParameterRange::new("x", ValueKind::Float, 2.0, 1.0);
        assert!(matches!(result, Err(SpaceError::InvertedBounds { .. })));
    }

    #[test]
    fn test_int_range_must_contain_an_integer() {
        let result = ParameterRange::new("x", ValueKind::Int, 4.2, 4.8);
        assert!(matches!(result, Err(SpaceError::EmptyIntRange { .. })));
    }

    #[test]
    fn test_range_sample_stays_in_bounds() {
        let range = ParameterRange::new("x", ValueKind::Int, 3.0, 9.0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = range.sample(&mut rng);
            assert!(range.contains(v));
            assert!(v.as_int().is_some());
        }
    }

    #[test]
    fn test_clamp_to_rounds_integers() {
        let range = ParameterRange::new("x", ValueKind::Int, 0.0, 10.0).unwrap();
        assert_eq!(range.clamp_to(4.6), ParamValue::Int(5));
        assert_eq!(range.clamp_to(-3.0), ParamValue::Int(0));
        assert_eq!(range.clamp_to(42.0), ParamValue::Int(10));
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let v: ParamValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, ParamValue::Int(3));
        let v: ParamValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, ParamValue::Float(3.5));
    }
}
