//! Dynamic values and the coercion rules between them.

use crate::error::CastError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Field name to value mapping an expression is evaluated against.
pub type Context = HashMap<String, Value>;

/// A dynamically typed value produced by evaluation or read from a context.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing field or JSON null.
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Result of evaluating a bracketed list literal.
    List(Vec<Value>),
}

/// Target of a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Int64,
    Bool,
    Float,
    Object,
    /// The empty kind name: no conversion.
    Any,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::String => "string",
            Kind::Int64 => "int64",
            Kind::Bool => "bool",
            Kind::Float => "float",
            Kind::Object => "object",
            Kind::Any => "any",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Kind {
    type Err = CastError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "" => Ok(Kind::Any),
            "string" => Ok(Kind::String),
            "int64" => Ok(Kind::Int64),
            "bool" => Ok(Kind::Bool),
            "float" => Ok(Kind::Float),
            "object" => Ok(Kind::Object),
            _ => Err(CastError::UnknownKind(name.to_string())),
        }
    }
}

/// Cast `value` to the kind named by `kind` (`string`, `int64`, `bool`,
/// `float`, `object` or the empty string).
pub fn cast(value: &Value, kind: &str) -> Result<Value, CastError> {
    value.cast(kind.parse()?)
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int64",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Convert to `kind`. Absent values become the zero value of the kind.
    pub fn cast(&self, kind: Kind) -> Result<Value, CastError> {
        match kind {
            Kind::Any | Kind::Object => Ok(self.clone()),
            Kind::String => self.as_string().map(Value::Str),
            Kind::Int64 => self.as_i64().map(Value::Int),
            Kind::Bool => self.as_bool().map(Value::Bool),
            Kind::Float => self.as_f64().map(Value::Float),
        }
    }

    pub fn as_bool(&self) -> Result<bool, CastError> {
        match self {
            Value::Absent => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Str(s) if s.is_empty() => Ok(false),
            Value::Str(s) => parse_bool(s).ok_or_else(|| CastError::Malformed {
                text: s.clone(),
                to: Kind::Bool,
            }),
            _ => Err(self.unsupported(Kind::Bool)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, CastError> {
        match self {
            Value::Absent => Ok(0),
            Value::Int(i) => Ok(*i),
            Value::Float(f) => Ok(*f as i64),
            Value::Str(s) if s.is_empty() => Ok(0),
            Value::Str(s) => s.trim().parse().map_err(|_| CastError::Malformed {
                text: s.clone(),
                to: Kind::Int64,
            }),
            _ => Err(self.unsupported(Kind::Int64)),
        }
    }

    pub fn as_f64(&self) -> Result<f64, CastError> {
        match self {
            Value::Absent => Ok(0.0),
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Str(s) if s.is_empty() => Ok(0.0),
            Value::Str(s) => s.trim().parse().map_err(|_| CastError::Malformed {
                text: s.clone(),
                to: Kind::Float,
            }),
            _ => Err(self.unsupported(Kind::Float)),
        }
    }

    pub fn as_string(&self) -> Result<String, CastError> {
        match self {
            Value::Absent => Ok(String::new()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Str(s) => Ok(s.clone()),
            _ => Err(self.unsupported(Kind::String)),
        }
    }

    fn unsupported(&self, to: Kind) -> CastError {
        CastError::Unsupported {
            from: self.type_name(),
            to,
        }
    }

    /// Convert a JSON value. Objects have no counterpart and are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Value, CastError> {
        match json {
            serde_json::Value::Null => Ok(Value::Absent),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(CastError::Unrepresentable(n.to_string()))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => Err(CastError::Unrepresentable(json.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Absent => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

/// Build a context from a JSON object. `null` yields the absent sentinel.
pub fn context_from_json(json: &serde_json::Value) -> Result<Option<Context>, CastError> {
    match json {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
            .collect::<Result<Context, CastError>>()
            .map(Some),
        other => Err(CastError::Unrepresentable(other.to_string())),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Literal form, as it appears in expression text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
