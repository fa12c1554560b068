//! Argument shape inspection.
//!
//! A service method's argument must be one of three shapes: a named record
//! (a struct), a string-keyed map, or a sequence. The shape is read from the
//! type's own `Deserialize` implementation by handing it a probing
//! deserializer that records the first request the implementation makes and
//! then aborts. Nothing is ever decoded.

use std::fmt;

use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, Visitor};

use crate::error::ContractViolation;

/// Semantic shape of a service method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// A named record with a fixed set of fields.
    Record {
        /// Type name as seen by serde.
        name: &'static str,
        /// Wire names of the fields, after serde renames.
        fields: &'static [&'static str],
    },
    /// A mapping from string keys to arbitrary values.
    Map,
    /// An ordered sequence.
    Sequence,
}

impl ArgShape {
    /// Whether this is a record.
    #[must_use]
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Field names of a record; empty for other shapes.
    #[must_use]
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Record { fields, .. } => *fields,
            Self::Map | Self::Sequence => &[],
        }
    }
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { name, .. } => write!(f, "record `{name}`"),
            Self::Map => f.write_str("string-keyed map"),
            Self::Sequence => f.write_str("sequence"),
        }
    }
}

/// The verified argument half of a method contract.
///
/// # Example
///
/// ```rust
/// use hermes_core::{ArgContract, ArgShape};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Login {
///     user: String,
///     password: String,
/// }
///
/// let contract = ArgContract::inspect::<Login>().unwrap();
/// assert_eq!(contract.shape().fields(), &["user", "password"]);
///
/// assert!(ArgContract::inspect::<u64>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgContract {
    type_name: &'static str,
    shape: ArgShape,
}

impl ArgContract {
    /// Inspects `A` and accepts it if its shape is a record, a string-keyed
    /// map or a sequence.
    pub fn inspect<A: DeserializeOwned>() -> Result<Self, ContractViolation> {
        let type_name = std::any::type_name::<A>();
        let mut seen = None;
        let outcome = A::deserialize(Probe { seen: &mut seen });

        match seen {
            Some(Observed::Shape(shape)) => Ok(Self { type_name, shape }),
            Some(Observed::Rejected(found)) => {
                Err(ContractViolation::UnsupportedArgument { type_name, found })
            }
            Some(Observed::NonStringKey(key)) => {
                Err(ContractViolation::NonStringKeys { type_name, key })
            }
            None => Err(ContractViolation::Uninspectable {
                type_name,
                reason: match outcome {
                    Err(ProbeError(Some(msg))) => msg,
                    Err(ProbeError(None)) | Ok(_) => {
                        "deserialize implementation made no request".to_string()
                    }
                },
            }),
        }
    }

    /// Rust type name of the argument.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Shape of the argument.
    #[must_use]
    pub fn shape(&self) -> &ArgShape {
        &self.shape
    }
}

enum Observed {
    Shape(ArgShape),
    Rejected(&'static str),
    NonStringKey(&'static str),
}

/// `None` means the probe stopped on purpose after recording what it saw.
#[derive(Debug)]
struct ProbeError(Option<String>);

impl ProbeError {
    fn stop() -> Self {
        Self(None)
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(msg) => f.write_str(msg),
            None => f.write_str("shape probe finished"),
        }
    }
}

impl std::error::Error for ProbeError {}

impl de::Error for ProbeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(Some(msg.to_string()))
    }
}

struct Probe<'a> {
    seen: &'a mut Option<Observed>,
}

impl Probe<'_> {
    fn reject<T>(self, found: &'static str) -> Result<T, ProbeError> {
        *self.seen = Some(Observed::Rejected(found));
        Err(ProbeError::stop())
    }
}

macro_rules! reject_shapes {
    ($($method:ident => $found:literal,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
                self.reject($found)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Probe<'_> {
    type Error = ProbeError;

    reject_shapes! {
        deserialize_any => "a self-describing value",
        deserialize_bool => "a boolean",
        deserialize_i8 => "an integer",
        deserialize_i16 => "an integer",
        deserialize_i32 => "an integer",
        deserialize_i64 => "an integer",
        deserialize_i128 => "an integer",
        deserialize_u8 => "an unsigned integer",
        deserialize_u16 => "an unsigned integer",
        deserialize_u32 => "an unsigned integer",
        deserialize_u64 => "an unsigned integer",
        deserialize_u128 => "an unsigned integer",
        deserialize_f32 => "a float",
        deserialize_f64 => "a float",
        deserialize_char => "a character",
        deserialize_str => "a string",
        deserialize_string => "a string",
        deserialize_bytes => "a byte array",
        deserialize_byte_buf => "a byte array",
        deserialize_option => "an option",
        deserialize_unit => "the unit type",
        deserialize_identifier => "an identifier",
        deserialize_ignored_any => "an ignored value",
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.seen = Some(Observed::Shape(ArgShape::Record { name, fields: &[] }));
        Err(ProbeError::stop())
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        *self.seen = Some(Observed::Shape(ArgShape::Sequence));
        Err(ProbeError::stop())
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a tuple")
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a tuple struct")
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        *self.seen = Some(Observed::Shape(ArgShape::Map));
        visitor.visit_map(KeyProbe { seen: self.seen })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.seen = Some(Observed::Shape(ArgShape::Record { name, fields }));
        Err(ProbeError::stop())
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("an enum")
    }
}

/// Map access that asks for exactly one key, to learn the key type.
struct KeyProbe<'a> {
    seen: &'a mut Option<Observed>,
}

impl<'de> MapAccess<'de> for KeyProbe<'_> {
    type Error = ProbeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        seed.deserialize(KeyDeserializer {
            seen: &mut *self.seen,
        })
        .map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        _seed: V,
    ) -> Result<V::Value, Self::Error> {
        Err(ProbeError::stop())
    }
}

struct KeyDeserializer<'a> {
    seen: &'a mut Option<Observed>,
}

impl KeyDeserializer<'_> {
    fn string_key<T>(self) -> Result<T, ProbeError> {
        Err(ProbeError::stop())
    }

    fn reject<T>(self, key: &'static str) -> Result<T, ProbeError> {
        *self.seen = Some(Observed::NonStringKey(key));
        Err(ProbeError::stop())
    }
}

macro_rules! string_keys {
    ($($method:ident,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
                self.string_key()
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'_> {
    type Error = ProbeError;

    string_keys! {
        deserialize_str,
        deserialize_string,
        deserialize_identifier,
        deserialize_char,
    }

    reject_shapes! {
        deserialize_any => "a self-describing value",
        deserialize_bool => "a boolean",
        deserialize_i8 => "an integer",
        deserialize_i16 => "an integer",
        deserialize_i32 => "an integer",
        deserialize_i64 => "an integer",
        deserialize_i128 => "an integer",
        deserialize_u8 => "an unsigned integer",
        deserialize_u16 => "an unsigned integer",
        deserialize_u32 => "an unsigned integer",
        deserialize_u64 => "an unsigned integer",
        deserialize_u128 => "an unsigned integer",
        deserialize_f32 => "a float",
        deserialize_f64 => "a float",
        deserialize_bytes => "a byte array",
        deserialize_byte_buf => "a byte array",
        deserialize_option => "an option",
        deserialize_unit => "the unit type",
        deserialize_seq => "a sequence",
        deserialize_map => "a map",
        deserialize_ignored_any => "an ignored value",
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a unit struct")
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a tuple")
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a tuple struct")
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("a struct")
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.reject("an enum")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{Map, Value};
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Pair {
        #[serde(rename = "A")]
        a: i64,
        b: Option<i64>,
    }

    #[derive(Debug, Deserialize)]
    struct Nothing;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Ids(Vec<u32>);

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    enum Mode {
        Fast,
        Slow,
    }

    fn shape_of<A: DeserializeOwned>() -> Result<ArgShape, ContractViolation> {
        ArgContract::inspect::<A>().map(|c| *c.shape())
    }

    #[test]
    fn test_record_fields_use_wire_names() {
        assert_eq!(
            shape_of::<Pair>().unwrap(),
            ArgShape::Record {
                name: "Pair",
                fields: &["A", "b"],
            }
        );
    }

    #[test]
    fn test_unit_struct_is_empty_record() {
        let shape = shape_of::<Nothing>().unwrap();
        assert!(shape.is_record());
        assert!(shape.fields().is_empty());
    }

    #[test]
    fn test_string_keyed_maps() {
        assert_eq!(shape_of::<HashMap<String, i32>>().unwrap(), ArgShape::Map);
        assert_eq!(shape_of::<BTreeMap<String, Value>>().unwrap(), ArgShape::Map);
        assert_eq!(shape_of::<Map<String, Value>>().unwrap(), ArgShape::Map);
    }

    #[test]
    fn test_sequences_and_newtypes() {
        assert_eq!(shape_of::<Vec<String>>().unwrap(), ArgShape::Sequence);
        assert_eq!(shape_of::<Ids>().unwrap(), ArgShape::Sequence);
    }

    #[test]
    fn test_non_string_keys_rejected() {
        let err = shape_of::<HashMap<u32, String>>().unwrap_err();
        assert!(matches!(err, ContractViolation::NonStringKeys { .. }));
    }

    #[test]
    fn test_scalars_and_friends_rejected() {
        for err in [
            shape_of::<u64>().unwrap_err(),
            shape_of::<String>().unwrap_err(),
            shape_of::<Option<Pair>>().unwrap_err(),
            shape_of::<(i32, i32)>().unwrap_err(),
            shape_of::<Mode>().unwrap_err(),
            shape_of::<Value>().unwrap_err(),
        ] {
            assert!(
                matches!(err, ContractViolation::UnsupportedArgument { .. }),
                "unexpected: {err:?}"
            );
        }
    }

    #[test]
    fn test_violation_reports_what_was_found() {
        match shape_of::<bool>().unwrap_err() {
            ContractViolation::UnsupportedArgument { type_name, found } => {
                assert_eq!(type_name, "bool");
                assert_eq!(found, "a boolean");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
