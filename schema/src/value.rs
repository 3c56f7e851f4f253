use indexmap::IndexMap;
use std::fmt;

/// Ordered `key -> value` annotations attached to a declaration.
///
/// Both `@name(value)` annotations and `[name = value]` modifiers end up here,
/// in source order. A bare key (`[primary]`, `@indexed`) maps to `Value::Bool(true)`.
pub type Modifiers = IndexMap<String, Value>;

/// A literal or reference value as written in the schema source.
///
/// Values are opaque to the compiler: they are stored on modifiers, enum
/// choices and variables so that generators can interpret them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A dotted name such as `Status.ACTIVE`, kept unresolved.
    Path(Vec<String>),
    Array(Vec<Value>),
    /// A `{key: value}` literal. Keys are kept in source order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// A convenience method to extract the value out of an [Int](#variant.Int).
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    /// A convenience method to extract the value out of a [Float](#variant.Float).
    /// Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(value) => Some(value),
            Value::Int(value) => Some(value as f64),
            _ => None,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// A convenience method to extract the segments of a [Path](#variant.Path).
    pub fn as_path(&self) -> Option<&[String]> {
        match self {
            Value::Path(segments) => Some(segments),
            _ => None,
        }
    }

    /// Looks a key up in a [Map](#variant.Map). Bare-name keys are stored as
    /// single-segment paths, so `get("a")` matches both `{a: 1}` and `{"a": 1}`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find_map(|(k, v)| {
                let matches = match k {
                    Value::String(s) => s == key,
                    Value::Path(p) => p.len() == 1 && p[0] == key,
                    _ => false,
                };
                matches.then_some(v)
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::String(value) => write!(f, "{:?}", value),
            Value::Path(segments) => f.write_str(&segments.join(".")),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
