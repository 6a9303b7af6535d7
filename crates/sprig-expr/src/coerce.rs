//! Best-effort conversion from dynamic values to typed fields
//!
//! Coercion never fails loudly. An incompatible shape yields `None` and the
//! caller applies its documented default.
//!
//! Rules:
//! - numbers widen (int to float) and integral floats narrow to ints
//! - numeric strings parse to numbers, `"true"`/`"false"` parse to bools
//! - controlled vocabularies match their names case-insensitively
//! - everything else passes through only when the shape already matches

use serde_json::{Map, Value};

/// Conversion from a dynamic value
pub trait FromDynamic: Sized {
    /// Convert, returning `None` when the value has an incompatible shape
    fn from_dynamic(value: &Value) -> Option<Self>;
}

impl FromDynamic for Value {
    fn from_dynamic(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromDynamic for bool {
    fn from_dynamic(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl FromDynamic for i64 {
    fn from_dynamic(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .and_then(|f| i64::from_dynamic(&Value::from(f)))
                })
            }
            _ => None,
        }
    }
}

impl FromDynamic for i32 {
    fn from_dynamic(value: &Value) -> Option<Self> {
        i64::from_dynamic(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromDynamic for u64 {
    fn from_dynamic(value: &Value) -> Option<Self> {
        i64::from_dynamic(value).and_then(|n| u64::try_from(n).ok())
    }
}

impl FromDynamic for f64 {
    fn from_dynamic(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }
}

impl FromDynamic for String {
    fn from_dynamic(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl<T: FromDynamic> FromDynamic for Vec<T> {
    fn from_dynamic(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(T::from_dynamic)
            .collect::<Option<Vec<_>>>()
    }
}

impl FromDynamic for Map<String, Value> {
    fn from_dynamic(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// Implement [`FromDynamic`] for a fieldless enum by case-insensitive name
///
/// ```ignore
/// sprig_expr::dynamic_enum!(ToastDuration { Short => "short", Long => "long" });
/// ```
#[macro_export]
macro_rules! dynamic_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::FromDynamic for $ty {
            fn from_dynamic(value: &$crate::__private::Value) -> Option<Self> {
                let text = value.as_str()?.trim();
                $(
                    if text.eq_ignore_ascii_case($name) {
                        return Some($ty::$variant);
                    }
                )+
                None
            }
        }

        impl $ty {
            /// Canonical name of this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }
    };
}
