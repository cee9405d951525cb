//! Host-value parameter encoding and result-value decoding.
//!
//! The engine neither needs nor wants an extensible `FromValue`/`ToValue`
//! trait: callers supply exactly the tagged [`Param`] variants below and
//! receive exactly the tagged [`Value`] variants back. Everything the wire
//! sends that the engine does not model as a scalar falls through to its
//! raw text representation.

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};

/// A host value to bind as a query parameter.
///
/// Parameters are always sent in text format (format code 0); see
/// `encode` for the exact wire representation of each variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v.into())
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Param::Null,
        }
    }
}

/// The wire encoding of one bound parameter: its inferred type OID, text
/// bytes (absent for NULL), and format code (always text here).
pub struct EncodedParam {
    pub oid: Oid,
    pub bytes: Option<Vec<u8>>,
    pub format: FormatCode,
}

impl Param {
    /// Type OID the server should use when parsing this parameter, and its
    /// text-format bytes. See the parameter-encoding table: integers pick
    /// the narrowest of int4/int8/text that fits.
    pub fn encode(&self) -> EncodedParam {
        match self {
            Param::Null => EncodedParam { oid: 0, bytes: None, format: FormatCode::Text },
            Param::Int(n) => {
                let encoded_oid = if i32::try_from(*n).is_ok() { oid::INT4 } else { oid::INT8 };
                EncodedParam { oid: encoded_oid, bytes: Some(n.to_string().into_bytes()), format: FormatCode::Text }
            }
            Param::Float(f) => {
                EncodedParam { oid: oid::FLOAT8, bytes: Some(f.to_string().into_bytes()), format: FormatCode::Text }
            }
            Param::Bool(b) => {
                let byte = if *b { b"1" } else { b"0" };
                EncodedParam { oid: oid::BOOL, bytes: Some(byte.to_vec()), format: FormatCode::Text }
            }
            Param::Text(s) => {
                EncodedParam { oid: oid::TEXT, bytes: Some(s.clone().into_bytes()), format: FormatCode::Text }
            }
        }
    }
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Decode one wire field. `None` bytes means SQL NULL, independent of
    /// the column's declared type.
    pub fn decode(type_oid: Oid, format: FormatCode, bytes: Option<&[u8]>) -> Result<Self> {
        let Some(bytes) = bytes else {
            return Ok(Value::Null);
        };

        if format == FormatCode::Binary {
            // Never requested by this engine, but a defensive server could still send
            // one; surface it as raw text bytes rather than misinterpreting them.
            return Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned()));
        }

        match type_oid {
            oid::INT2 | oid::INT4 | oid::INT8 | oid::OID => {
                let text = decode_text(bytes)?;
                let n: i64 = text
                    .parse()
                    .map_err(|_| Error::Decode(format!("invalid integer text: {text:?}")))?;
                Ok(Value::Int(n))
            }
            oid::FLOAT4 | oid::FLOAT8 => {
                let text = decode_text(bytes)?;
                let f: f64 = text
                    .parse()
                    .map_err(|_| Error::Decode(format!("invalid float text: {text:?}")))?;
                Ok(Value::Float(f))
            }
            oid::BOOL => match bytes {
                b"t" => Ok(Value::Bool(true)),
                b"f" => Ok(Value::Bool(false)),
                other => Err(Error::Protocol(format!(
                    "invalid boolean text: {:?}",
                    String::from_utf8_lossy(other)
                ))),
            },
            _ => Ok(Value::Text(decode_text(bytes)?.to_string())),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Result<&str> {
    simdutf8::compat::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_param_picks_int4_within_range() {
        let encoded = Param::Int(42).encode();
        assert_eq!(encoded.oid, oid::INT4);
        assert_eq!(encoded.bytes.unwrap(), b"42");
    }

    #[test]
    fn int_param_picks_int8_outside_int4_range() {
        let encoded = Param::Int(i64::from(i32::MAX) + 1).encode();
        assert_eq!(encoded.oid, oid::INT8);
    }

    #[test]
    fn null_param_has_no_bytes() {
        let encoded = Param::Null.encode();
        assert_eq!(encoded.oid, 0);
        assert!(encoded.bytes.is_none());
    }

    #[test]
    fn bool_param_encodes_as_one_or_zero() {
        assert_eq!(Param::Bool(true).encode().bytes.unwrap(), b"1");
        assert_eq!(Param::Bool(false).encode().bytes.unwrap(), b"0");
    }

    #[test]
    fn decode_integers_by_oid() {
        let v = Value::decode(oid::INT4, FormatCode::Text, Some(b"123")).unwrap();
        assert_eq!(v, Value::Int(123));
        let v = Value::decode(oid::INT8, FormatCode::Text, Some(b"-5")).unwrap();
        assert_eq!(v, Value::Int(-5));
    }

    #[test]
    fn decode_bool() {
        assert_eq!(Value::decode(oid::BOOL, FormatCode::Text, Some(b"t")).unwrap(), Value::Bool(true));
        assert_eq!(Value::decode(oid::BOOL, FormatCode::Text, Some(b"f")).unwrap(), Value::Bool(false));
        assert!(Value::decode(oid::BOOL, FormatCode::Text, Some(b"x")).is_err());
    }

    #[test]
    fn decode_null() {
        assert_eq!(Value::decode(oid::INT4, FormatCode::Text, None).unwrap(), Value::Null);
    }

    #[test]
    fn decode_unknown_oid_as_text() {
        let v = Value::decode(99999, FormatCode::Text, Some(b"hello")).unwrap();
        assert_eq!(v, Value::Text("hello".to_string()));
    }
}
