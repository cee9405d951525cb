//! Wire protocol framing and the primitive reader/writer helpers built on it.
//!
//! PostgreSQL uses big-endian (network byte order) for every multi-byte
//! integer on the wire.

use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};

use crate::error::{Error, Result};

/// Minimum number of bytes in a post-startup frame: the length field itself.
const MIN_FRAME_LEN: usize = 4;

/// Incrementally parses length-prefixed frames out of an accumulating buffer.
///
/// `feed` appends newly-read bytes; `take_message` non-destructively checks
/// whether a full frame is available and, if so, advances the read cursor
/// and returns it. This split lets a caller hand the codec whatever chunk
/// size the transport happened to deliver without losing partial frames.
pub struct Codec {
    buf: Vec<u8>,
    cursor: usize,
}

/// Outcome of `Codec::take_message`.
pub enum TakeResult<'a> {
    /// A complete frame was available and has been consumed.
    Message { type_byte: u8, payload: &'a [u8] },
    /// Not enough bytes buffered yet for a full frame.
    NeedMore,
}

impl Codec {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(8192), cursor: 0 }
    }

    /// Append freshly read bytes to the receive buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.cursor == self.buf.len() {
            // Nothing pending: reuse the buffer from the front instead of growing forever.
            self.buf.clear();
            self.cursor = 0;
        } else if self.cursor > 0 {
            self.buf.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Try to take one complete `(type_byte, payload)` frame.
    ///
    /// A `length` field under 4 is a protocol violation: it can never cover
    /// itself.
    pub fn take_message(&mut self) -> Result<TakeResult<'_>> {
        let data = &self.buf[self.cursor..];
        if data.len() < 1 + MIN_FRAME_LEN {
            return Ok(TakeResult::NeedMore);
        }

        let type_byte = data[0];
        let length = I32BE::ref_from_bytes(&data[1..5])
            .map_err(|e| Error::Protocol(format!("frame length: {e:?}")))?
            .get();
        if length < MIN_FRAME_LEN as i32 {
            return Err(Error::Protocol(format!("frame length {length} shorter than the length field itself")));
        }
        let payload_len = length as usize - MIN_FRAME_LEN;
        let frame_len = 1 + MIN_FRAME_LEN + payload_len;
        if data.len() < frame_len {
            return Ok(TakeResult::NeedMore);
        }

        let payload = &self.buf[self.cursor + 5..self.cursor + frame_len];
        self.cursor += frame_len;
        Ok(TakeResult::Message { type_byte, payload })
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a 1-byte unsigned integer.
#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    if data.is_empty() {
        return Err(Error::Protocol("read_u8: empty buffer".into()));
    }
    Ok((data[0], &data[1..]))
}

/// Read a 2-byte big-endian signed integer.
#[inline]
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    if data.len() < 2 {
        return Err(Error::Protocol(format!("read_i16: buffer too short: {} < 2", data.len())));
    }
    let value = I16BE::ref_from_bytes(&data[..2])
        .map_err(|e| Error::Protocol(format!("read_i16: {e:?}")))?
        .get();
    Ok((value, &data[2..]))
}

/// Read a 2-byte big-endian unsigned integer.
#[inline]
pub fn read_u16(data: &[u8]) -> Result<(u16, &[u8])> {
    if data.len() < 2 {
        return Err(Error::Protocol(format!("read_u16: buffer too short: {} < 2", data.len())));
    }
    let value = U16BE::ref_from_bytes(&data[..2])
        .map_err(|e| Error::Protocol(format!("read_u16: {e:?}")))?
        .get();
    Ok((value, &data[2..]))
}

/// Read a 4-byte big-endian signed integer.
#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::Protocol(format!("read_i32: buffer too short: {} < 4", data.len())));
    }
    let value = I32BE::ref_from_bytes(&data[..4])
        .map_err(|e| Error::Protocol(format!("read_i32: {e:?}")))?
        .get();
    Ok((value, &data[4..]))
}

/// Read a 4-byte big-endian unsigned integer.
#[inline]
pub fn read_u32(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::Protocol(format!("read_u32: buffer too short: {} < 4", data.len())));
    }
    let value = U32BE::ref_from_bytes(&data[..4])
        .map_err(|e| Error::Protocol(format!("read_u32: {e:?}")))?
        .get();
    Ok((value, &data[4..]))
}

/// Read a null-terminated byte string, without the terminator.
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match memchr::memchr(0, data) {
        Some(pos) => Ok((&data[..pos], &data[pos + 1..])),
        None => Err(Error::Protocol("read_cstring: no null terminator found".into())),
    }
}

/// Read a null-terminated string, decoded as UTF-8.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Protocol(format!("read_cstr: invalid UTF-8: {e}")))?;
    Ok((s, rest))
}

#[inline]
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

#[inline]
pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
}

#[inline]
pub fn write_cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Builds one length-prefixed message, patching the length field in on `finish`.
///
/// Message layout: type byte (1, omitted for the startup message) | length
/// (4, big-endian, covers itself and the payload) | payload.
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        buf.push(type_byte);
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self { buf, start }
    }

    /// Start a startup-style message, which has no leading type byte.
    pub fn new_untyped(buf: &'a mut Vec<u8>) -> Self {
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self { buf, start }
    }

    pub fn buf(&mut self) -> &mut Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        write_u8(self.buf, value);
    }

    pub fn write_i16(&mut self, value: i16) {
        write_i16(self.buf, value);
    }

    pub fn write_i32(&mut self, value: i32) {
        write_i32(self.buf, value);
    }

    pub fn write_u32(&mut self, value: u32) {
        write_u32(self.buf, value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        write_bytes(self.buf, data);
    }

    pub fn write_cstr(&mut self, s: &str) {
        write_cstr(self.buf, s);
    }

    pub fn finish(self) {
        let len = (self.buf.len() - self.start) as i32;
        self.buf[self.start..self.start + 4].copy_from_slice(&len.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_message_waits_for_full_frame() {
        let mut codec = Codec::new();
        codec.feed(b"Z\x00\x00\x00");
        assert!(matches!(codec.take_message().unwrap(), TakeResult::NeedMore));

        codec.feed(b"\x05I");
        match codec.take_message().unwrap() {
            TakeResult::Message { type_byte, payload } => {
                assert_eq!(type_byte, b'Z');
                assert_eq!(payload, b"I");
            }
            TakeResult::NeedMore => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn take_message_consumes_only_one_frame_at_a_time() {
        let mut codec = Codec::new();
        codec.feed(b"1\x00\x00\x00\x04");
        codec.feed(b"2\x00\x00\x00\x04");

        let first = codec.take_message().unwrap();
        assert!(matches!(first, TakeResult::Message { type_byte: b'1', payload } if payload.is_empty()));

        let second = codec.take_message().unwrap();
        assert!(matches!(second, TakeResult::Message { type_byte: b'2', payload } if payload.is_empty()));
    }

    #[test]
    fn rejects_length_shorter_than_itself() {
        let mut codec = Codec::new();
        codec.feed(b"E\x00\x00\x00\x02");
        assert!(codec.take_message().is_err());
    }

    #[test]
    fn message_builder_patches_length() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1");
        msg.finish();

        assert_eq!(buf[0], b'Q');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
    }
}
