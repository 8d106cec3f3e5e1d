//! Tagged values held by a [`DataBlock`](crate::DataBlock).

use serde::{Deserialize, Serialize};

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Real,
    Bool,
    Str,
    IntVec,
    RealVec,
}

impl ValueKind {
    /// Returns `true` for vector tags.
    #[must_use]
    pub fn is_vector(self) -> bool {
        matches!(self, Self::IntVec | Self::RealVec)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Real => "real",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::IntVec => "int vector",
            Self::RealVec => "real vector",
        };
        f.write_str(name)
    }
}

/// A tagged value.
///
/// # Example
///
/// ```
/// use cosmix_block::{Value, ValueKind};
///
/// let v = Value::parse_as(ValueKind::Bool, "T").unwrap();
/// assert_eq!(v, Value::Bool(true));
///
/// let v = Value::parse_as(ValueKind::RealVec, "0.1 0.2, 0.3").unwrap();
/// assert_eq!(v, Value::RealVec(vec![0.1, 0.2, 0.3]));
///
/// assert!(Value::parse_as(ValueKind::Int, "0.5").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    IntVec(Vec<i64>),
    RealVec(Vec<f64>),
}

impl Value {
    /// Returns the type tag.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Real(_) => ValueKind::Real,
            Self::Bool(_) => ValueKind::Bool,
            Self::Str(_) => ValueKind::Str,
            Self::IntVec(_) => ValueKind::IntVec,
            Self::RealVec(_) => ValueKind::RealVec,
        }
    }

    /// Parses `text` as a value of the given tag.
    ///
    /// Returns `None` when the text is not a valid representation of that
    /// tag. Strings always parse (surrounding quotes are stripped).
    #[must_use]
    pub fn parse_as(kind: ValueKind, text: &str) -> Option<Self> {
        let text = text.trim();
        match kind {
            ValueKind::Int => text.parse().ok().map(Self::Int),
            ValueKind::Real => text.parse().ok().map(Self::Real),
            ValueKind::Bool => parse_bool(text).map(Self::Bool),
            ValueKind::Str => Some(Self::Str(strip_quotes(text).to_string())),
            ValueKind::IntVec => split_list(text)
                .map(|t| t.parse().ok())
                .collect::<Option<Vec<i64>>>()
                .map(Self::IntVec),
            ValueKind::RealVec => split_list(text)
                .map(|t| t.parse().ok())
                .collect::<Option<Vec<f64>>>()
                .map(Self::RealVec),
        }
    }

    /// Infers a tag from free text: int, then real, then bool, else string.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(r) = text.parse::<f64>() {
            return Self::Real(r);
        }
        match text {
            "T" | "F" | "true" | "false" | "True" | "False" => {
                Self::Bool(matches!(text, "T" | "true" | "True"))
            }
            _ => Self::Str(strip_quotes(text).to_string()),
        }
    }

    /// Real view; integers widen.
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Real vector view; integer vectors widen.
    #[must_use]
    pub fn as_real_vec(&self) -> Option<Vec<f64>> {
        match self {
            Self::RealVec(v) => Some(v.clone()),
            Self::IntVec(v) => Some(v.iter().map(|&i| i as f64).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int_vec(&self) -> Option<&[i64]> {
        match self {
            Self::IntVec(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements for vectors, `None` for scalars.
    #[must_use]
    pub fn vector_len(&self) -> Option<usize> {
        match self {
            Self::IntVec(v) => Some(v.len()),
            Self::RealVec(v) => Some(v.len()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Self::Str(s) => f.write_str(s),
            Self::IntVec(v) => write_joined(f, v),
            Self::RealVec(v) => write_joined(f, v),
        }
    }
}

fn write_joined<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::RealVec(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::IntVec(v)
    }
}

/// Types that can be read out of a [`Value`].
pub trait FromValue: Sized {
    /// Tag reported in type errors.
    const KIND: ValueKind;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Real;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_real()
    }
}

impl FromValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Str;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<f64> {
    const KIND: ValueKind = ValueKind::RealVec;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_real_vec()
    }
}

impl FromValue for Vec<i64> {
    const KIND: ValueKind = ValueKind::IntVec;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int_vec().map(<[i64]>::to_vec)
    }
}

/// Parses a boolean.
///
/// Accepts `T`/`F`, `true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`
/// (case-insensitive).
#[must_use]
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "y" | "on" => Some(true),
        "f" | "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Splits a whitespace- and/or comma-separated list.
pub fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_values() {
        for t in ["T", "true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["F", "false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_as_respects_kind() {
        assert_eq!(Value::parse_as(ValueKind::Int, " 42 "), Some(Value::Int(42)));
        assert_eq!(Value::parse_as(ValueKind::Real, "1"), Some(Value::Real(1.0)));
        assert_eq!(Value::parse_as(ValueKind::Int, "1.5"), None);
        assert_eq!(Value::parse_as(ValueKind::Bool, "perhaps"), None);
        assert_eq!(
            Value::parse_as(ValueKind::Str, "\"mead2020\""),
            Some(Value::Str("mead2020".into()))
        );
        assert_eq!(
            Value::parse_as(ValueKind::IntVec, "1,2 3"),
            Some(Value::IntVec(vec![1, 2, 3]))
        );
        assert_eq!(Value::parse_as(ValueKind::RealVec, "1 x"), None);
    }

    #[test]
    fn infer_prefers_numbers() {
        assert_eq!(Value::infer("3"), Value::Int(3));
        assert_eq!(Value::infer("3.5"), Value::Real(3.5));
        assert_eq!(Value::infer("T"), Value::Bool(true));
        assert_eq!(Value::infer("camb"), Value::Str("camb".into()));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Value::Real(100.261).to_string(), "100.261");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::RealVec(vec![1.0, 2.5]).to_string(), "1 2.5");
    }

    #[test]
    fn widening_views() {
        assert_eq!(Value::Int(2).as_real(), Some(2.0));
        assert_eq!(Value::IntVec(vec![1, 2]).as_real_vec(), Some(vec![1.0, 2.0]));
        assert_eq!(Value::Real(2.0).as_int(), None);
    }

    #[test]
    fn serde_is_tagged() {
        let json = serde_json::to_string(&Value::Real(0.5)).expect("serialize");
        assert_eq!(json, r#"{"type":"real","value":0.5}"#);
        let back: Value = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Value::Real(0.5));
    }
}
