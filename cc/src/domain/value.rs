//! Typed parameter values and declared parameter schemas
//!
//! Control laws and condition tests are configured uniformly: a descriptor
//! carries a map from parameter name to [`TypedValue`], and every variant
//! declares the [`TypedParameter`]s it accepts. The concrete constructor
//! validates the map against its schema before anything is registered.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A primitive parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Double,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
        };
        f.write_str(s)
    }
}

impl TypedValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to doubles
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a value of this variant may fill a parameter of type `expected`
    fn fits(&self, expected: ValueType) -> bool {
        match (self.value_type(), expected) {
            (found, expected) if found == expected => true,
            (ValueType::Int, ValueType::Double) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for TypedValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for TypedValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Rejected parameter maps
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("Missing required parameter '{name}'")]
    Missing { name: String },

    #[error("Parameter '{name}' expects {expected}, got {found}")]
    WrongType {
        name: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Parameter '{name}' = {value} outside [{min}, {max}]")]
    OutOfRange { name: String, value: f64, min: f64, max: f64 },

    #[error("Unknown parameter '{name}'")]
    Unknown { name: String },

    #[error("Parameter '{name}' has invalid value: {reason}")]
    Invalid { name: String, reason: String },
}

/// Schema entry for one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl TypedParameter {
    pub fn required(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            required: true,
            min: None,
            max: None,
            description: String::new(),
        }
    }

    pub fn optional(name: &str, value_type: ValueType) -> Self {
        Self {
            required: false,
            ..Self::required(name, value_type)
        }
    }

    /// Inclusive numeric bounds
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Check a single supplied value against this entry
    pub fn check(&self, value: &TypedValue) -> Result<(), ParameterError> {
        if !value.fits(self.value_type) {
            return Err(ParameterError::WrongType {
                name: self.name.clone(),
                expected: self.value_type,
                found: value.value_type(),
            });
        }

        if let Some(v) = value.as_f64() {
            let min = self.min.unwrap_or(f64::NEG_INFINITY);
            let max = self.max.unwrap_or(f64::INFINITY);
            if v.is_nan() || v < min || v > max {
                return Err(ParameterError::OutOfRange {
                    name: self.name.clone(),
                    value: v,
                    min,
                    max,
                });
            }
        }

        Ok(())
    }
}

/// Named parameter values supplied for one law or test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, TypedValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<TypedValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<TypedValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypedValue)> {
        self.0.iter()
    }

    /// Validate every supplied value against `schema` and require the
    /// required entries
    pub fn validate(&self, schema: &[TypedParameter]) -> Result<(), ParameterError> {
        for (name, value) in &self.0 {
            let entry = schema
                .iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| ParameterError::Unknown { name: name.clone() })?;
            entry.check(value)?;
        }

        if let Some(missing) = schema.iter().find(|p| p.required && !self.0.contains_key(&p.name)) {
            return Err(ParameterError::Missing {
                name: missing.name.clone(),
            });
        }

        Ok(())
    }

    pub fn f64(&self, name: &str) -> Result<f64, ParameterError> {
        self.typed(name, ValueType::Double, TypedValue::as_f64)
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).and_then(TypedValue::as_f64).unwrap_or(default)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(TypedValue::as_bool).unwrap_or(default)
    }

    pub fn string(&self, name: &str) -> Result<&str, ParameterError> {
        self.typed(name, ValueType::String, TypedValue::as_str)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: ValueType,
        extract: impl Fn(&'a TypedValue) -> Option<T>,
    ) -> Result<T, ParameterError> {
        let value = self.get(name).ok_or_else(|| ParameterError::Missing { name: name.to_string() })?;
        extract(value).ok_or_else(|| ParameterError::WrongType {
            name: name.to_string(),
            expected,
            found: value.value_type(),
        })
    }
}

impl FromIterator<(String, TypedValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn yaw_schema() -> Vec<TypedParameter> {
        vec![
            TypedParameter::required("yaw", ValueType::Double).range(-PI, PI),
            TypedParameter::optional("sim", ValueType::Bool),
        ]
    }

    #[test]
    fn test_untagged_yaml_decoding() {
        let params: Parameters = serde_yaml::from_str("yaw: 1.5\nsim: true\ncount: 3\nside: left\n").unwrap();
        assert_eq!(params.get("yaw"), Some(&TypedValue::Double(1.5)));
        assert_eq!(params.get("sim"), Some(&TypedValue::Bool(true)));
        assert_eq!(params.get("count"), Some(&TypedValue::Int(3)));
        assert_eq!(params.get("side"), Some(&TypedValue::String("left".to_string())));
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let params = Parameters::new().with("yaw", 0.5).with("sim", true);
        assert!(params.validate(&yaw_schema()).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let params = Parameters::new().with("sim", true);
        let err = params.validate(&yaw_schema()).unwrap_err();
        assert_eq!(err, ParameterError::Missing { name: "yaw".to_string() });
    }

    #[test]
    fn test_validate_out_of_range() {
        let params = Parameters::new().with("yaw", 4.0);
        let err = params.validate(&yaw_schema()).unwrap_err();
        assert!(matches!(err, ParameterError::OutOfRange { ref name, .. } if name == "yaw"));
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_validate_bounds_are_inclusive() {
        let params = Parameters::new().with("yaw", PI);
        assert!(params.validate(&yaw_schema()).is_ok());
    }

    #[test]
    fn test_validate_wrong_type() {
        let params = Parameters::new().with("yaw", "north");
        let err = params.validate(&yaw_schema()).unwrap_err();
        assert_eq!(
            err,
            ParameterError::WrongType {
                name: "yaw".to_string(),
                expected: ValueType::Double,
                found: ValueType::String,
            }
        );
    }

    #[test]
    fn test_int_widens_to_double() {
        let params = Parameters::new().with("yaw", 1i64);
        assert!(params.validate(&yaw_schema()).is_ok());
        assert_eq!(params.f64("yaw").unwrap(), 1.0);
    }

    #[test]
    fn test_validate_unknown_parameter() {
        let params = Parameters::new().with("yaw", 0.0).with("speed", 1.0);
        let err = params.validate(&yaw_schema()).unwrap_err();
        assert_eq!(err, ParameterError::Unknown { name: "speed".to_string() });
    }

    #[test]
    fn test_accessor_defaults() {
        let params = Parameters::new();
        assert_eq!(params.f64_or("speed", 0.4), 0.4);
        assert!(!params.bool_or("sim", false));
        assert!(params.string("side").is_err());
    }
}
