//! Script Values
//!
//! Values as the script engine sees them: a superset of the wire model
//! that also carries function references. Function references never
//! cross the process boundary; they are stripped on this side and
//! replaced with the pending-callback machinery.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::value::{ListValue, Value};

use super::context::ExecutionContext;

/// Reference to a script callback function.
///
/// Invoked with the execution context it was captured in; the protocol
/// driver guarantees that context is still alive when it calls.
pub type ScriptFunction = Rc<dyn Fn(&ExecutionContext, &[ScriptValue])>;

/// A script-side value.
#[derive(Clone)]
pub enum ScriptValue {
    Undefined,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    List(Vec<ScriptValue>),
    Dictionary(BTreeMap<String, ScriptValue>),
    Function(ScriptFunction),
}

impl ScriptValue {
    pub fn is_function(&self) -> bool {
        matches!(self, ScriptValue::Function(_))
    }

    /// Marshals to the wire representation. Function references become
    /// `Value::None`; the host never receives a function value.
    pub fn to_value(&self) -> Value {
        match self {
            ScriptValue::Undefined => Value::None,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Int(n) => Value::Int(*n),
            ScriptValue::Double(n) => Value::Double(*n),
            ScriptValue::String(s) => Value::String(s.clone()),
            ScriptValue::List(items) => {
                Value::List(items.iter().map(ScriptValue::to_value).collect())
            }
            ScriptValue::Dictionary(map) => Value::Dictionary(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect(),
            ),
            ScriptValue::Function(_) => Value::None,
        }
    }

    pub fn from_value(value: &Value) -> ScriptValue {
        match value {
            Value::None => ScriptValue::Undefined,
            Value::Bool(b) => ScriptValue::Bool(*b),
            Value::Int(n) => ScriptValue::Int(*n),
            Value::Double(n) => ScriptValue::Double(*n),
            Value::String(s) => ScriptValue::String(s.clone()),
            Value::List(items) => {
                ScriptValue::List(items.iter().map(ScriptValue::from_value).collect())
            }
            Value::Dictionary(map) => ScriptValue::Dictionary(
                map.iter()
                    .map(|(key, value)| (key.clone(), ScriptValue::from_value(value)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "Undefined"),
            ScriptValue::Bool(b) => write!(f, "Bool({})", b),
            ScriptValue::Int(n) => write!(f, "Int({})", n),
            ScriptValue::Double(n) => write!(f, "Double({})", n),
            ScriptValue::String(s) => write!(f, "String({:?})", s),
            ScriptValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ScriptValue::Dictionary(map) => f.debug_tuple("Dictionary").field(map).finish(),
            ScriptValue::Function(_) => write!(f, "Function"),
        }
    }
}

/// Unmarshals message arguments from index `from` onward into script
/// values, preserving order.
pub(crate) fn script_args(args: &ListValue, from: usize) -> Vec<ScriptValue> {
    args.iter().skip(from).map(ScriptValue::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_marshals_to_none() {
        let function: ScriptFunction = Rc::new(|_, _| {});
        assert_eq!(ScriptValue::Function(function).to_value(), Value::None);
    }

    #[test]
    fn test_nested_round_trip() {
        let mut dict = BTreeMap::new();
        dict.insert("k".to_string(), ScriptValue::Double(1.5));
        let original = ScriptValue::List(vec![
            ScriptValue::Int(1),
            ScriptValue::String("two".into()),
            ScriptValue::Dictionary(dict),
            ScriptValue::Undefined,
        ]);

        let wire = original.to_value();
        let back = ScriptValue::from_value(&wire);
        assert_eq!(back.to_value(), wire);
    }

    #[test]
    fn test_script_args_skips_header() {
        let list: ListValue = vec![
            Value::Int(0),
            Value::String("name".into()),
            Value::Int(0),
            Value::Int(5),
        ]
        .into();
        let args = script_args(&list, 3);
        assert_eq!(args.len(), 1);
        assert!(matches!(args[0], ScriptValue::Int(5)));
    }
}
