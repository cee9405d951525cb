//! Fake-server byte builders and a minimal scripted server driven over a
//! `tokio::io::duplex` pair, standing in for a real PostgreSQL backend.

use pg_wire_engine::protocol::backend::msg_type as backend;
use pg_wire_engine::protocol::codec::{Codec, TakeResult};
use pg_wire_engine::protocol::frontend::msg_type as frontend;
use tokio::io::{AsyncReadExt, DuplexStream};

pub fn frame(type_byte: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.push(type_byte);
    out.extend_from_slice(&((payload.len() + 4) as i32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn authentication_ok() -> Vec<u8> {
    frame(backend::AUTHENTICATION, &0i32.to_be_bytes())
}

pub fn parameter_status(name: &str, value: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(name.as_bytes());
    payload.push(0);
    payload.extend_from_slice(value.as_bytes());
    payload.push(0);
    frame(backend::PARAMETER_STATUS, &payload)
}

pub fn ready_for_query(status: u8) -> Vec<u8> {
    frame(backend::READY_FOR_QUERY, &[status])
}

pub fn parse_complete() -> Vec<u8> {
    frame(backend::PARSE_COMPLETE, &[])
}

pub fn bind_complete() -> Vec<u8> {
    frame(backend::BIND_COMPLETE, &[])
}

pub fn row_description(columns: &[(&str, u32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(columns.len() as u16).to_be_bytes());
    for (name, type_oid) in columns {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&0u32.to_be_bytes()); // table oid
        payload.extend_from_slice(&0i16.to_be_bytes()); // column id
        payload.extend_from_slice(&type_oid.to_be_bytes());
        payload.extend_from_slice(&(-1i16).to_be_bytes()); // type size
        payload.extend_from_slice(&(-1i32).to_be_bytes()); // type modifier
        payload.extend_from_slice(&0u16.to_be_bytes()); // format: text
    }
    frame(backend::ROW_DESCRIPTION, &payload)
}

pub fn data_row(values: &[Option<&[u8]>]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(values.len() as u16).to_be_bytes());
    for value in values {
        match value {
            Some(bytes) => {
                payload.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                payload.extend_from_slice(bytes);
            }
            None => payload.extend_from_slice(&(-1i32).to_be_bytes()),
        }
    }
    frame(backend::DATA_ROW, &payload)
}

pub fn command_complete(tag: &str) -> Vec<u8> {
    let mut payload = tag.as_bytes().to_vec();
    payload.push(0);
    frame(backend::COMMAND_COMPLETE, &payload)
}

pub fn error_response(fields: &[(u8, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (code, value) in fields {
        payload.push(*code);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
    }
    payload.push(0);
    frame(backend::ERROR_RESPONSE, &payload)
}

/// Drains the untyped `StartupMessage` (no leading type byte) and replies
/// with `AuthenticationOk`, the given status parameters, and `ReadyForQuery`.
pub async fn complete_startup(stream: &mut DuplexStream, extra_params: &[(&str, &str)]) {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.expect("read startup length");
    let len = i32::from_be_bytes(len_buf) as usize;
    let mut rest = vec![0u8; len - 4];
    stream.read_exact(&mut rest).await.expect("read startup body");

    let mut reply = authentication_ok();
    reply.extend(parameter_status("server_version", "16.0"));
    for (name, value) in extra_params {
        reply.extend(parameter_status(name, value));
    }
    reply.extend(ready_for_query(b'I'));

    use tokio::io::AsyncWriteExt;
    stream.write_all(&reply).await.expect("write startup reply");
}

/// Reads frontend frames until one whose type byte is `Q` (simple query) or
/// `S` (extended-path Sync), i.e. the end of one logical request.
pub async fn await_request(stream: &mut DuplexStream) -> Vec<(u8, Vec<u8>)> {
    let mut codec = Codec::new();
    let mut collected = Vec::new();
    loop {
        match codec.take_message().expect("parse frontend frame") {
            TakeResult::Message { type_byte, payload } => {
                collected.push((type_byte, payload.to_vec()));
                if type_byte == frontend::QUERY || type_byte == frontend::SYNC {
                    return collected;
                }
            }
            TakeResult::NeedMore => {
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).await.expect("read frontend bytes");
                assert!(n > 0, "client closed the stream mid-request");
                codec.feed(&buf[..n]);
            }
        }
    }
}

/// Writes `bytes` to the stream split into single-byte chunks, exercising
/// the partial-frame feeding path on the receiving side.
pub async fn send_byte_by_byte(stream: &mut DuplexStream, bytes: &[u8]) {
    use tokio::io::AsyncWriteExt;
    for byte in bytes {
        stream.write_all(std::slice::from_ref(byte)).await.expect("write byte");
    }
}
