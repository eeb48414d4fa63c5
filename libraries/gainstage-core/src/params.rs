//! Flat parameter storage
//!
//! Effects exchange their settings with the host as a flat map of named
//! scalars. The host owns persistence; this module only defines the map
//! contract and the documented default/min/max of each parameter.

use crate::error::{GainstageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single stored parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Host-side key-value store for effect parameters
pub trait ParamStore {
    fn get(&self, key: &str) -> Option<ParamValue>;

    fn set(&mut self, key: &str, value: ParamValue);

    /// Whether any key starts with `prefix`
    fn contains_group(&self, prefix: &str) -> bool;

    /// Persist pending writes
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Rust types that can be stored as a [`ParamValue`]
pub trait ParamKind: Copy + PartialOrd + std::fmt::Debug {
    /// Type name used in error messages
    const NAME: &'static str;

    fn from_value(value: ParamValue) -> Option<Self>;

    fn into_value(self) -> ParamValue;
}

impl ParamKind for bool {
    const NAME: &'static str = "bool";

    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Bool(self)
    }
}

impl ParamKind for i64 {
    const NAME: &'static str = "integer";

    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int(i) => Some(i),
            _ => None,
        }
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Int(self)
    }
}

impl ParamKind for f64 {
    const NAME: &'static str = "float";

    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(f) => Some(f),
            // Integer literals are accepted where a float is expected
            ParamValue::Int(i) => Some(i as f64),
            ParamValue::Bool(_) => None,
        }
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Float(self)
    }
}

/// Key, default and valid range of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec<T> {
    pub key: &'static str,
    pub default: T,
    pub min: T,
    pub max: T,
}

impl<T: ParamKind> ParamSpec<T> {
    pub const fn new(key: &'static str, default: T, min: T, max: T) -> Self {
        Self {
            key,
            default,
            min,
            max,
        }
    }

    /// Read and verify the parameter
    ///
    /// Missing keys yield the default. Present values of the wrong type or
    /// outside `[min, max]` are rejected, never clamped.
    pub fn read(&self, store: &dyn ParamStore) -> Result<T> {
        let Some(raw) = store.get(self.key) else {
            return Ok(self.default);
        };

        let value = T::from_value(raw).ok_or_else(|| GainstageError::ParameterType {
            key: self.key.to_string(),
            expected: T::NAME,
        })?;

        if self.contains(value) {
            Ok(value)
        } else {
            Err(GainstageError::invalid_parameter(
                self.key,
                format!("{:?} outside {:?}..={:?}", raw, self.min, self.max),
            ))
        }
    }

    pub fn write(&self, store: &mut dyn ParamStore, value: T) {
        store.set(self.key, value.into_value());
    }

    /// Whether `value` lies inside `[min, max]` (NaN never does)
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into `[min, max]`
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// In-memory [`ParamStore`], serializable for config files and tests
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryParamStore {
    values: BTreeMap<String, ParamValue>,
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParamStore for MemoryParamStore {
    fn get(&self, key: &str) -> Option<ParamValue> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    fn contains_group(&self, prefix: &str) -> bool {
        self.values.keys().any(|key| key.starts_with(prefix))
    }
}

/// View of a store that prefixes every key with a group path
///
/// Lets parameters written with bare keys land in a settings group such as
/// `/Effects/LoudnessNormalization/CurrentSettings/`.
pub struct ParamGroup<'a> {
    store: &'a mut dyn ParamStore,
    prefix: &'a str,
}

impl<'a> ParamGroup<'a> {
    pub fn new(store: &'a mut dyn ParamStore, prefix: &'a str) -> Self {
        Self { store, prefix }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl ParamStore for ParamGroup<'_> {
    fn get(&self, key: &str) -> Option<ParamValue> {
        self.store.get(&self.full_key(key))
    }

    fn set(&mut self, key: &str, value: ParamValue) {
        let key = self.full_key(key);
        self.store.set(&key, value);
    }

    fn contains_group(&self, prefix: &str) -> bool {
        self.store.contains_group(&self.full_key(prefix))
    }

    fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }
}
