use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The type tag of a setting, used for declaration and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingKind::Bool => "bool",
            SettingKind::Int => "int",
            SettingKind::Float => "float",
            SettingKind::Str => "string",
        };
        f.write_str(name)
    }
}

/// A concrete setting value.
///
/// Values are tagged so that the registry can check them against the declared
/// [`SettingKind`] before they are stored.
///
/// Serialized as a bare scalar. JSON has no literal for non-finite numbers, so
/// infinite and NaN floats are written as the strings `"inf"`, `"-inf"` and
/// `"nan"`, and those strings read back as floats.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Float(_) => SettingKind::Float,
            SettingValue::Str(_) => SettingKind::Str,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(x) => Some(*x),
            SettingValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets a command-line literal: `true`/`false`, then integer, then
    /// float, otherwise the text itself.
    pub fn parse_literal(text: &str) -> SettingValue {
        let text = text.trim();
        if let Ok(b) = text.parse::<bool>() {
            SettingValue::Bool(b)
        } else if let Ok(i) = text.parse::<i64>() {
            SettingValue::Int(i)
        } else if let Ok(x) = text.parse::<f64>() {
            SettingValue::Float(x)
        } else {
            SettingValue::Str(text.to_string())
        }
    }

    /// The value without quoting, as handed to external programs.
    pub fn to_plain_string(&self) -> String {
        match self {
            SettingValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Float(x) => write!(f, "{}", x),
            SettingValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

const POS_INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";
const NOT_A_NUMBER: &str = "nan";

fn non_finite_name(x: f64) -> &'static str {
    if x.is_nan() {
        NOT_A_NUMBER
    } else if x > 0.0 {
        POS_INFINITY
    } else {
        NEG_INFINITY
    }
}

fn non_finite_value(name: &str) -> Option<f64> {
    match name {
        POS_INFINITY => Some(f64::INFINITY),
        NEG_INFINITY => Some(f64::NEG_INFINITY),
        NOT_A_NUMBER => Some(f64::NAN),
        _ => None,
    }
}

impl Serialize for SettingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SettingValue::Bool(b) => serializer.serialize_bool(*b),
            SettingValue::Int(i) => serializer.serialize_i64(*i),
            SettingValue::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            SettingValue::Float(x) => serializer.serialize_str(non_finite_name(*x)),
            SettingValue::Str(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Bool(b) => SettingValue::Bool(b),
            RawValue::Int(i) => SettingValue::Int(i),
            RawValue::Float(x) => SettingValue::Float(x),
            RawValue::Str(s) => match non_finite_value(&s) {
                Some(x) => SettingValue::Float(x),
                None => SettingValue::Str(s),
            },
        })
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(value as i64)
    }
}

impl From<usize> for SettingValue {
    fn from(value: usize) -> Self {
        SettingValue::Int(value as i64)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Str(value)
    }
}
