//! Wire Value Model
//!
//! The typed, ordered-argument-list representation that crosses the
//! process boundary: scalars, lists, and string-keyed dictionaries.
//! Function references never appear here; they exist only on the script
//! side and are stripped before marshaling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single wire-safe value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/undefined.
    None,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    List(ListValue),
    Dictionary(BTreeMap<String, Value>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Dictionary(_) => ValueType::Dictionary,
        }
    }
}

/// Declared argument type for a registered function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    None,
    Bool,
    Int,
    Double,
    String,
    List,
    Dictionary,
    /// Wildcard: accepts any actual type.
    Any,
}

impl ValueType {
    /// Whether a concrete value satisfies this declared type.
    ///
    /// `Any` accepts everything. `Double` also accepts integers, since
    /// script numbers arrive as either depending on their value.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::Double => matches!(value, Value::Int(_) | Value::Double(_)),
            declared => declared == value.value_type(),
        }
    }
}

/// An ordered list of values, the argument container of every message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListValue(Vec<Value>);

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Sets `index`, padding any gap with `Value::None`.
    pub fn set(&mut self, index: usize, value: Value) {
        if index >= self.0.len() {
            self.0.resize(index + 1, Value::None);
        }
        self.0[index] = value;
    }

    pub fn get_int(&self, index: usize) -> Option<i32> {
        match self.0.get(index) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_double(&self, index: usize) -> Option<f64> {
        match self.0.get(index) {
            Some(Value::Double(n)) => Some(*n),
            Some(Value::Int(n)) => Some(f64::from(*n)),
            _ => None,
        }
    }

    pub fn get_bool(&self, index: usize) -> Option<bool> {
        match self.0.get(index) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        match self.0.get(index) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Copies every element `i` into `dest[i + offset]`, dropping
    /// elements whose destination index would be negative. Order and
    /// values are preserved exactly.
    ///
    /// `offset = -1` strips the leading call identifier when handing
    /// arguments to a native implementation; `offset = 3` appends result
    /// values after the `[id, name, status]` response header.
    pub fn copy_into(&self, dest: &mut ListValue, offset: isize) {
        for (i, value) in self.0.iter().enumerate() {
            let target = i as isize + offset;
            if target >= 0 {
                dest.set(target as usize, value.clone());
            }
        }
    }
}

impl From<Vec<Value>> for ListValue {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for ListValue {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
