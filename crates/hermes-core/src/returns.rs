//! Classification of service method return values.
//!
//! Every return type implements [`IntoMethodReturn`], which sorts the value
//! into one of the [`MethodReturn`] variants. The adapter maps each variant to
//! a status line and an envelope.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::envelope::FormattedResponse;

/// A return value after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodReturn {
    /// The method chose its own envelope. `None` means nothing is written.
    Envelope(Option<FormattedResponse>),
    /// The method failed; the text becomes the envelope's `data`.
    Failure(String),
    /// A plain value, written as JSON with status 200.
    Value(Value),
}

/// Conversion from a method's return type into a [`MethodReturn`].
///
/// Implemented for envelopes, `Result`, `()`, [`serde_json::Value`],
/// common collections and the [`Raw`] wrapper. Application types returned as
/// plain JSON can use [`raw_return!`](crate::raw_return) or [`Raw`].
pub trait IntoMethodReturn: Send + 'static {
    /// Classifies `self`, encoding plain values as JSON.
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error>;
}

/// Wrapper marking any serializable value as a plain JSON return.
///
/// ```rust
/// use hermes_core::{IntoMethodReturn, MethodReturn, Raw};
///
/// let ret = Raw(vec![1, 2, 3]).into_method_return().unwrap();
/// assert_eq!(ret, MethodReturn::Value(serde_json::json!([1, 2, 3])));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Raw<T>(pub T);

impl<T: Serialize + Send + 'static> IntoMethodReturn for Raw<T> {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        serde_json::to_value(&self.0).map(MethodReturn::Value)
    }
}

impl IntoMethodReturn for MethodReturn {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        Ok(self)
    }
}

impl IntoMethodReturn for FormattedResponse {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        Ok(MethodReturn::Envelope(Some(self)))
    }
}

impl IntoMethodReturn for Option<FormattedResponse> {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        Ok(MethodReturn::Envelope(self))
    }
}

impl<T, E> IntoMethodReturn for Result<T, E>
where
    T: IntoMethodReturn,
    E: Display + Send + 'static,
{
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        match self {
            Ok(value) => value.into_method_return(),
            Err(err) => Ok(MethodReturn::Failure(err.to_string())),
        }
    }
}

impl IntoMethodReturn for () {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        Ok(MethodReturn::Value(Value::Null))
    }
}

impl IntoMethodReturn for Value {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        Ok(MethodReturn::Value(self))
    }
}

/// Implements [`IntoMethodReturn`] for types returned as plain JSON.
///
/// ```rust
/// use hermes_core::{raw_return, IntoMethodReturn, MethodReturn};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Sum {
///     total: i64,
/// }
///
/// raw_return!(Sum);
///
/// let ret = Sum { total: 3 }.into_method_return().unwrap();
/// assert_eq!(ret, MethodReturn::Value(serde_json::json!({"total": 3})));
/// ```
#[macro_export]
macro_rules! raw_return {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::IntoMethodReturn for $ty {
                fn into_method_return(
                    self,
                ) -> ::core::result::Result<$crate::MethodReturn, $crate::__private::serde_json::Error> {
                    $crate::__private::serde_json::to_value(&self).map($crate::MethodReturn::Value)
                }
            }
        )+
    };
}

raw_return!(String, bool, i32, i64, u32, u64, f64);

impl<T: Serialize + Send + 'static> IntoMethodReturn for Vec<T> {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        serde_json::to_value(&self).map(MethodReturn::Value)
    }
}

impl<V: Serialize + Send + 'static> IntoMethodReturn for std::collections::HashMap<String, V> {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        serde_json::to_value(&self).map(MethodReturn::Value)
    }
}

impl<V: Serialize + Send + 'static> IntoMethodReturn for std::collections::BTreeMap<String, V> {
    fn into_method_return(self) -> Result<MethodReturn, serde_json::Error> {
        serde_json::to_value(&self).map(MethodReturn::Value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_envelope_variants() {
        let env = FormattedResponse::new(403, "forbidden", json!({"who": "you"}));
        assert_eq!(
            env.clone().into_method_return().unwrap(),
            MethodReturn::Envelope(Some(env))
        );
        assert_eq!(
            None::<FormattedResponse>.into_method_return().unwrap(),
            MethodReturn::Envelope(None)
        );
    }

    #[test]
    fn test_result_error_becomes_failure() {
        let ret: Result<(), String> = Err("expected error".to_string());
        assert_eq!(
            ret.into_method_return().unwrap(),
            MethodReturn::Failure("expected error".to_string())
        );
    }

    #[test]
    fn test_result_ok_envelope_stays_envelope() {
        let ret: Result<FormattedResponse, std::io::Error> =
            Ok(FormattedResponse::ok(Value::Null));
        assert!(matches!(
            ret.into_method_return().unwrap(),
            MethodReturn::Envelope(Some(_))
        ));
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(
            ().into_method_return().unwrap(),
            MethodReturn::Value(Value::Null)
        );
        assert_eq!(
            "hi".to_string().into_method_return().unwrap(),
            MethodReturn::Value(json!("hi"))
        );
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        assert_eq!(
            map.into_method_return().unwrap(),
            MethodReturn::Value(json!({"a": 1}))
        );
    }

    #[test]
    fn test_unencodable_raw_value() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1_u8], 1);
        assert!(Raw(map).into_method_return().is_err());
    }
}
