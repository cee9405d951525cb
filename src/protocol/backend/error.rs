//! `ErrorResponse` / `NoticeResponse` field parsing.

use std::collections::HashMap;

use crate::error::{Error, Result, ServerError, field_type};
use crate::protocol::codec::read_cstr;

/// Parse the `{type-byte}{value}\0 ... \0` field list shared by
/// `ErrorResponse` and `NoticeResponse`.
fn parse_fields(payload: &[u8]) -> Result<HashMap<u8, String>> {
    let mut fields = HashMap::new();
    let mut data = payload;

    while !data.is_empty() && data[0] != 0 {
        let code = data[0];
        let (value, rest) = read_cstr(&data[1..])?;
        fields.insert(code, value.to_string());
        data = rest;
    }

    Ok(fields)
}

/// A fatal `ErrorResponse` from the server.
///
/// Requires `S` (severity), `C` (SQLSTATE), and `M` (message); anything
/// missing those is itself a protocol violation rather than a `ServerError`.
#[derive(Debug)]
pub struct ErrorResponse(ServerError);

impl ErrorResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let fields = parse_fields(payload)?;
        if !fields.contains_key(&field_type::SEVERITY) {
            return Err(Error::Protocol("ErrorResponse missing severity field 'S'".into()));
        }
        if !fields.contains_key(&field_type::CODE) {
            return Err(Error::Protocol("ErrorResponse missing code field 'C'".into()));
        }
        if !fields.contains_key(&field_type::MESSAGE) {
            return Err(Error::Protocol("ErrorResponse missing message field 'M'".into()));
        }
        Ok(Self(ServerError::new(fields)))
    }

    pub fn into_error(self) -> Error {
        Error::Server(self.0)
    }

    pub fn into_server_error(self) -> ServerError {
        self.0
    }
}

/// A non-fatal `NoticeResponse`. Parsed only to validate framing; the
/// message is discarded by the state machine unless a caller-registered
/// sink wants it.
#[derive(Debug)]
pub struct NoticeResponse(pub ServerError);

impl NoticeResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self(ServerError::new(parse_fields(payload)?)))
    }
}
