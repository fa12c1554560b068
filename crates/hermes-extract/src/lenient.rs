//! A forgiving deserializer over merged argument data.
//!
//! Keyed sources deliver strings, JSON bodies deliver typed values, and both
//! end up side by side in one [`Value`]. [`Lenient`] lets the target type pull
//! what it needs from either:
//!
//! - numbers and booleans parse from strings
//! - a scalar target facing an array (a repeated key) takes the last element
//! - a sequence target facing a scalar sees a one-element sequence
//! - `null` reads as `None` or unit
//!
//! Everything else behaves like deserializing from a `serde_json::Value`.
//!
//! [`from_merged`] applies these rules only to the top-level entries that came
//! from keyed sources; values taken from a JSON body must already carry the
//! target's type.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Error as _, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::Deserializer;
use serde_json::{Map, Value};

type Error = serde_json::Error;

/// Decodes `T` from `value` with lenient scalar coercion.
///
/// # Example
///
/// ```rust
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Page {
///     number: u32,
///     tags: Vec<String>,
///     draft: Option<bool>,
/// }
///
/// let page: Page = hermes_extract::lenient::from_value(&json!({
///     "number": ["1", "2"],
///     "tags": "rust",
///     "draft": "true",
/// }))
/// .unwrap();
///
/// assert_eq!(page.number, 2);
/// assert_eq!(page.tags, vec!["rust"]);
/// assert_eq!(page.draft, Some(true));
/// ```
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    T::deserialize(Lenient::new(value))
}

/// Decodes `T` from merged argument data.
///
/// Top-level entries whose key is in `keyed` are read leniently, all other
/// entries strictly. Non-object values are read strictly as a whole.
///
/// ```rust
/// use std::collections::BTreeSet;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Page {
///     number: u32,
///     size: u32,
/// }
///
/// let keyed: BTreeSet<String> = ["number".to_string()].into();
/// let merged = json!({"number": "2", "size": "10"});
/// assert!(hermes_extract::lenient::from_merged::<Page>(&merged, &keyed).is_err());
///
/// let merged = json!({"number": "2", "size": 10});
/// let page: Page = hermes_extract::lenient::from_merged(&merged, &keyed).unwrap();
/// assert_eq!((page.number, page.size), (2, 10));
/// ```
pub fn from_merged<T: DeserializeOwned>(value: &Value, keyed: &BTreeSet<String>) -> Result<T, Error> {
    T::deserialize(Merged { value, keyed })
}

/// Deserializer wrapping a borrowed [`Value`].
#[derive(Debug, Clone, Copy)]
pub struct Lenient<'de> {
    value: &'de Value,
}

impl<'de> Lenient<'de> {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: &'de Value) -> Self {
        Self { value }
    }

    /// The value a scalar target should read: the last element of a
    /// non-empty array, the value itself otherwise.
    fn scalar(self) -> &'de Value {
        match self.value {
            Value::Array(items) => items.last().unwrap_or(self.value),
            other => other,
        }
    }

    fn parse<T, V>(self, visitor: &V) -> Result<Option<T>, Error>
    where
        T: FromStr,
        V: Visitor<'de>,
    {
        match self.scalar() {
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|_| Error::invalid_value(Unexpected::Str(s), visitor)),
            _ => Ok(None),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => Some(false),
        _ => None,
    }
}

macro_rules! lenient_number {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                match self.parse::<$ty, V>(&visitor)? {
                    Some(n) => visitor.$visit(n),
                    None => self.scalar().$method(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Lenient<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(_) => self.value.deserialize_any(visitor),
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Array(items) => visitor.visit_seq(LenientSeq::new(items)),
            Value::Object(map) => visitor.visit_map(LenientMap::new(map)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.scalar() {
            Value::String(s) => match parse_bool(s) {
                Some(b) => visitor.visit_bool(b),
                None => Err(Error::invalid_value(Unexpected::Str(s), &visitor)),
            },
            other => other.deserialize_bool(visitor),
        }
    }

    lenient_number! {
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_i128 => i128, visit_i128;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_u128 => u128, visit_u128;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.scalar().deserialize_char(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.scalar().deserialize_str(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.scalar().deserialize_string(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            Value::Array(items) => visitor.visit_seq(LenientSeq::new(items)),
            other => other.deserialize_bytes(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Object(map) if map.is_empty() => visitor.visit_unit(),
            other => Err(Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Array(items) => visitor.visit_seq(LenientSeq::new(items)),
            Value::Null | Value::Object(_) => {
                Err(Error::invalid_type(unexpected(self.value), &visitor))
            }
            scalar => visitor.visit_seq(LenientSeq::new(std::slice::from_ref(scalar))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Object(map) => visitor.visit_map(LenientMap::new(map)),
            other => Err(Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.scalar().deserialize_enum(name, variants, visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(n) => n
            .as_f64()
            .map_or(Unexpected::Other("number"), Unexpected::Float),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

struct LenientSeq<'de> {
    iter: std::slice::Iter<'de, Value>,
}

impl<'de> LenientSeq<'de> {
    fn new(items: &'de [Value]) -> Self {
        Self { iter: items.iter() }
    }
}

impl<'de> SeqAccess<'de> for LenientSeq<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        self.iter
            .next()
            .map(|value| seed.deserialize(Lenient::new(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct LenientMap<'de> {
    iter: serde_json::map::Iter<'de>,
    pending: Option<&'de Value>,
}

impl<'de> LenientMap<'de> {
    fn new(map: &'de Map<String, Value>) -> Self {
        Self {
            iter: map.iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for LenientMap<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(BorrowedStrDeserializer::<Error>::new(key))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        match self.pending.take() {
            Some(value) => seed.deserialize(Lenient::new(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Top-level deserializer for [`from_merged`].
struct Merged<'k, 'de> {
    value: &'de Value,
    keyed: &'k BTreeSet<String>,
}

impl<'de> Deserializer<'de> for Merged<'_, 'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Object(map) => visitor.visit_map(MergedMap::new(map, self.keyed)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        Lenient::new(self.value).deserialize_unit(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.value.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Object(map) => visitor.visit_map(MergedMap::new(map, self.keyed)),
            other => Err(Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value.deserialize_enum(name, variants, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf tuple tuple_struct identifier ignored_any
    }
}

struct MergedMap<'k, 'de> {
    iter: serde_json::map::Iter<'de>,
    keyed: &'k BTreeSet<String>,
    pending: Option<(&'de str, &'de Value)>,
}

impl<'k, 'de> MergedMap<'k, 'de> {
    fn new(map: &'de Map<String, Value>, keyed: &'k BTreeSet<String>) -> Self {
        Self {
            iter: map.iter(),
            keyed,
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for MergedMap<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some((key, value));
                seed.deserialize(BorrowedStrDeserializer::<Error>::new(key))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        match self.pending.take() {
            Some((key, value)) if self.keyed.contains(key) => seed.deserialize(Lenient::new(value)),
            Some((_, value)) => seed.deserialize(value),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
