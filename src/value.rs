//! Scalar attribute values.
//!
//! Resolved attribute maps only ever hold literal scalars, never nested
//! structures, so they can be rendered as plain key-value records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal attribute value.
///
/// Serialized untagged, so `{"weight": "bold", "size": 12}` round-trips as
/// plain JSON scalars.
///
/// # Examples
///
/// ```
/// use clipmark::Value;
///
/// assert_eq!(Value::from("bold").as_str(), Some("bold"));
/// assert_eq!(Value::from(12).as_number(), Some(12.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub const fn as_flag(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Integers widen to `f64`; strings and flags have no numeric reading.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_number(&self) -> Option<f64> {
        match *self {
            Self::Int(n) => Some(n as f64),
            Self::Float(x) => Some(x),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// Short name of the variant, used in validation messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bool(b) => b.fmt(f),
            Self::Int(n) => n.fmt(f),
            Self::Float(x) => x.fmt(f),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant($conv(v))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool(std::convert::identity),
    i32 => Int(i64::from),
    u32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    f64 => Float(std::convert::identity),
    String => String(std::convert::identity),
    &str => String(str::to_owned),
}
