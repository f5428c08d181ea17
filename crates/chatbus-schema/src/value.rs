use std::fmt;

/// Basic wire types an argument or property can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Str,
    Bool,
    I32,
    U32,
    I64,
    U64,
    F64,
}

impl ArgType {
    /// Single-character D-Bus type code.
    pub const fn signature(self) -> &'static str {
        match self {
            ArgType::Str => "s",
            ArgType::Bool => "b",
            ArgType::I32 => "i",
            ArgType::U32 => "u",
            ArgType::I64 => "x",
            ArgType::U64 => "t",
            ArgType::F64 => "d",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

/// A decoded argument or property value.
///
/// `Unsupported` carries the signature of a wire value outside the basic set, so a
/// handler can still report what it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Unsupported(String),
}

impl Value {
    pub fn arg_type(&self) -> Option<ArgType> {
        match self {
            Value::Str(_) => Some(ArgType::Str),
            Value::Bool(_) => Some(ArgType::Bool),
            Value::I32(_) => Some(ArgType::I32),
            Value::U32(_) => Some(ArgType::U32),
            Value::I64(_) => Some(ArgType::I64),
            Value::U64(_) => Some(ArgType::U64),
            Value::F64(_) => Some(ArgType::F64),
            Value::Unsupported(_) => None,
        }
    }

    pub fn signature(&self) -> &str {
        match self {
            Value::Unsupported(sig) => sig,
            other => other.arg_type().map_or("", ArgType::signature),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::U32(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_follow_type_codes() {
        assert_eq!(Value::from("x").signature(), "s");
        assert_eq!(Value::Bool(true).signature(), "b");
        assert_eq!(Value::U64(1).signature(), "t");
        assert_eq!(Value::Unsupported("a{sv}".to_owned()).signature(), "a{sv}");
    }

    #[test]
    fn unsupported_has_no_arg_type() {
        assert_eq!(Value::Unsupported("as".to_owned()).arg_type(), None);
        assert_eq!(Value::F64(0.5).arg_type(), Some(ArgType::F64));
    }

    #[test]
    fn string_accessors() {
        let v = Value::from(String::from("hello"));
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.into_string(), Some("hello".to_owned()));
        assert_eq!(Value::U32(7).as_str(), None);
    }
}
