//! Untyped props as they arrive from outside the engine.

use std::collections::BTreeMap;

/// A single untyped prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl RawValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(f64::from(n))
    }
}

impl From<u32> for RawValue {
    fn from(n: u32) -> Self {
        RawValue::Number(f64::from(n))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

/// A set of untyped props, keyed by prop name.
///
/// Component descriptors turn these into concrete props; see
/// [`ComponentDescriptor::clone_props`](crate::ComponentDescriptor::clone_props).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProps {
    values: BTreeMap<String, RawValue>,
}

impl RawProps {
    pub fn new() -> RawProps {
        RawProps::default()
    }

    /// Adds a prop, builder style.
    pub fn with<V: Into<RawValue>>(mut self, name: &str, value: V) -> RawProps {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn insert<V: Into<RawValue>>(&mut self, name: &str, value: V) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[test]
fn test_raw_props_builder() {
    let raw = RawProps::new()
        .with("opacity", 0.5)
        .with("collapsable", false)
        .with("nativeID", "header");

    assert_eq!(raw.get("opacity").and_then(RawValue::as_f64), Some(0.5));
    assert_eq!(raw.get("collapsable").and_then(RawValue::as_bool), Some(false));
    assert_eq!(raw.get("nativeID").and_then(RawValue::as_str), Some("header"));
    assert_eq!(raw.get("missing"), None);
    assert_eq!(raw.iter().count(), 3);
}
