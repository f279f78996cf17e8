//! # Value Encoding and Decoding
//!
//! Write path: the caller tags a value as raw text (`Payload::Text`, sent
//! verbatim) or structured data (`Payload::json`, JSON-encoded before the
//! call starts, so an encoding failure never reaches the store).
//!
//! Read path: replies are JSON-decoded into the destination. When decoding
//! fails, a string-like destination (one whose `Decode::decode_raw` returns
//! `Some`) takes the raw reply bytes as its literal value instead. A null
//! reply is "not found", never a decoding error.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use kvdao_client::RespValue;

use crate::error::{StoreError, StoreResult};

/// Value to be written, tagged by how it travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Sent verbatim.
    ///
    /// Reads still try JSON first, so text that is itself valid JSON comes
    /// back decoded: `"\"quoted\""` reads into a `String` as `quoted`, and
    /// `"123"` reads into an `i64`. Store such text as `Payload::json` when
    /// it must survive unchanged.
    Text(Cow<'a, str>),
    /// Pre-encoded JSON bytes.
    Structured(Vec<u8>),
}

impl<'a> Payload<'a> {
    pub fn text(value: impl Into<Cow<'a, str>>) -> Self {
        Payload::Text(value.into())
    }

    /// Encodes `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> StoreResult<Payload<'static>> {
        serde_json::to_vec(value)
            .map(Payload::Structured)
            .map_err(StoreError::Serialization)
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Structured(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_owned().into_bytes(),
            Payload::Structured(bytes) => bytes,
        }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(value: &'a str) -> Self {
        Payload::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(value: &'a String) -> Self {
        Payload::Text(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for Payload<'static> {
    fn from(value: String) -> Self {
        Payload::Text(Cow::Owned(value))
    }
}

/// Destination types for store replies.
///
/// User types opt in with an empty impl: `impl Decode for User {}`.
pub trait Decode: DeserializeOwned {
    /// Fallback used when JSON decoding fails. String-like destinations
    /// return the raw bytes as their value; everything else returns `None`.
    fn decode_raw(_raw: &[u8]) -> Option<Self> {
        None
    }
}

/// The raw fallback requires valid UTF-8; other bytes are a
/// `Deserialization` error, never silently replaced.
impl Decode for String {
    fn decode_raw(raw: &[u8]) -> Option<Self> {
        String::from_utf8(raw.to_vec()).ok()
    }
}

macro_rules! impl_decode {
    ($($ty:ty),* $(,)?) => {
        $(impl Decode for $ty {})*
    };
}

impl_decode!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    serde_json::Value,
);

impl<T: DeserializeOwned> Decode for Vec<T> {}

impl<T: DeserializeOwned> Decode for Option<T> {}

impl<K, V> Decode for HashMap<K, V>
where
    K: DeserializeOwned + Eq + Hash,
    V: DeserializeOwned,
{
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: DeserializeOwned + Ord,
    V: DeserializeOwned,
{
}

/// Decodes raw reply bytes into `T`, falling back to `decode_raw`.
pub fn decode<T: Decode>(command: &'static str, raw: &[u8]) -> StoreResult<T> {
    match serde_json::from_slice::<T>(raw) {
        Ok(value) => Ok(value),
        Err(source) => T::decode_raw(raw).ok_or(StoreError::Deserialization { command, source }),
    }
}

/// Extracts the scalar payload of a reply; `None` for the null reply.
pub(crate) fn reply_bytes(command: &'static str, reply: RespValue) -> StoreResult<Option<Vec<u8>>> {
    match reply {
        RespValue::Bulk(data) => Ok(data),
        RespValue::Simple(text) => Ok(Some(text)),
        RespValue::Integer(value) => Ok(Some(value.to_string().into_bytes())),
        other => Err(StoreError::reply_shape(command, "scalar", &other)),
    }
}

/// Decodes a scalar reply; `None` when the key (or member) is absent.
pub(crate) fn decode_reply<T: Decode>(command: &'static str, reply: RespValue) -> StoreResult<Option<T>> {
    match reply_bytes(command, reply)? {
        Some(raw) => decode(command, &raw).map(Some),
        None => Ok(None),
    }
}

/// Decodes each element of an array reply in order. Null elements become
/// `T::default()` so the output length always matches the reply length.
pub(crate) fn decode_elements<T: Decode + Default>(
    command: &'static str,
    reply: RespValue,
) -> StoreResult<Vec<T>> {
    let items = match reply {
        RespValue::Array(items) => items,
        RespValue::Bulk(None) => return Ok(Vec::new()),
        other => return Err(StoreError::reply_shape(command, "array", &other)),
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let value = match reply_bytes(command, item)? {
            Some(raw) => decode(command, &raw)?,
            None => T::default(),
        };
        values.push(value);
    }
    Ok(values)
}

/// Splits a flat `[k1, v1, k2, v2, ...]` array reply into byte pairs.
pub(crate) fn reply_pairs(command: &'static str, reply: RespValue) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let items = match reply {
        RespValue::Array(items) => items,
        RespValue::Bulk(None) => return Ok(Vec::new()),
        other => return Err(StoreError::reply_shape(command, "array", &other)),
    };
    if items.len() % 2 != 0 {
        return Err(StoreError::ReplyShape {
            command,
            expected: "even-length array",
            got: "odd-length array",
        });
    }

    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        let first = reply_bytes(command, first)?.unwrap_or_default();
        let second = reply_bytes(command, second)?.unwrap_or_default();
        pairs.push((first, second));
    }
    Ok(pairs)
}

/// Parses an integer carried as text, e.g. a SCAN cursor.
pub(crate) fn parse_integer(command: &'static str, raw: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or(StoreError::ReplyShape {
            command,
            expected: "integer text",
            got: "non-numeric text",
        })
}

/// Parses a float carried as text (ZSCORE, ZINCRBY, WITHSCORES).
pub(crate) fn parse_float(command: &'static str, raw: &[u8]) -> StoreResult<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or(StoreError::ReplyShape {
            command,
            expected: "float text",
            got: "non-numeric text",
        })
}
