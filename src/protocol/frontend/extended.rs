//! Extended query protocol messages.
//!
//! The engine only ever uses the unnamed statement and unnamed portal, so
//! `write_parse`/`write_bind`/`write_describe`/`write_execute` take no name
//! arguments. There is no prepared-statement cache and nothing to close.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::FormatCode;
use crate::value::Param;

/// Write a Parse message, creating the unnamed prepared statement.
///
/// `query` may contain `$1`, `$2`, ... placeholders. Each parameter's type
/// OID comes from `Param::encode`, matching the value that will later be
/// bound for it; PostgreSQL needs this to resolve otherwise-ambiguous
/// placeholders (e.g. a bare `$1` in a select list).
pub fn write_parse(buf: &mut Vec<u8>, query: &str, params: &[Param]) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PARSE);
    msg.write_cstr("");
    msg.write_cstr(query);
    msg.write_i16(params.len() as i16);
    for param in params {
        msg.write_i32(param.encode().oid as i32);
    }
    msg.finish();
}

/// Write a Bind message, creating the unnamed portal from the unnamed
/// statement. Every parameter is sent in text format; the caller's
/// `Param::encode` has already produced the bytes to carry.
pub fn write_bind(buf: &mut Vec<u8>, params: &[Param]) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::BIND);
    msg.write_cstr("");
    msg.write_cstr("");

    msg.write_i16(params.len() as i16);
    for _ in params {
        msg.write_i16(FormatCode::Text as i16);
    }

    msg.write_i16(params.len() as i16);
    for param in params {
        let encoded = param.encode();
        match encoded.bytes {
            Some(bytes) => {
                msg.write_i32(bytes.len() as i32);
                msg.write_bytes(&bytes);
            }
            None => msg.write_i32(-1),
        }
    }

    // Result format codes: empty means "all text", which is all this engine ever asks for.
    msg.write_i16(0);

    msg.finish();
}

/// Write a Describe message for the unnamed portal.
pub fn write_describe_portal(buf: &mut Vec<u8>) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::DESCRIBE);
    msg.write_u8(b'P');
    msg.write_cstr("");
    msg.finish();
}

/// Write an Execute message to run the unnamed portal to completion
/// (`max_rows` 0 means unlimited).
pub fn write_execute(buf: &mut Vec<u8>) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::EXECUTE);
    msg.write_cstr("");
    msg.write_i32(0);
    msg.finish();
}

/// Write a Sync message, ending the extended query sequence and prompting
/// a `ReadyForQuery`.
pub fn write_sync(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, super::msg_type::SYNC).finish();
}

/// Write a Flush message, forcing the server to send pending responses
/// without waiting for Sync.
pub fn write_flush(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, super::msg_type::FLUSH).finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names_the_unnamed_statement() {
        let mut buf = Vec::new();
        write_parse(&mut buf, "SELECT $1::int", &[Param::Int(1)]);

        assert_eq!(buf[0], b'P');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
        // empty statement name, then query
        assert_eq!(&buf[5..6], b"\0");
    }

    #[test]
    fn parse_writes_each_param_oid_from_its_encoding() {
        let mut buf = Vec::new();
        let query = "SELECT $1, $2";
        write_parse(&mut buf, query, &[Param::Bool(true), Param::Text("hi".into())]);

        // header (type + length) + empty statement name + query + its terminator + param count
        let oids_start = 5 + 1 + query.len() + 1 + 2;
        let first_oid = i32::from_be_bytes(buf[oids_start..oids_start + 4].try_into().unwrap());
        let second_oid = i32::from_be_bytes(buf[oids_start + 4..oids_start + 8].try_into().unwrap());
        assert_eq!(first_oid as u32, crate::protocol::types::oid::BOOL);
        assert_eq!(second_oid as u32, crate::protocol::types::oid::TEXT);
    }

    #[test]
    fn bind_encodes_params_as_text_with_lengths() {
        let mut buf = Vec::new();
        write_bind(&mut buf, &[Param::Int(7), Param::Null]);

        assert_eq!(buf[0], b'B');
        // portal name, statement name both empty
        assert_eq!(&buf[5..7], b"\0\0");
    }

    #[test]
    fn describe_portal_uses_p_and_empty_name() {
        let mut buf = Vec::new();
        write_describe_portal(&mut buf);

        assert_eq!(buf[0], b'D');
        assert_eq!(buf[5], b'P');
        assert_eq!(&buf[6..7], b"\0");
    }

    #[test]
    fn execute_requests_unlimited_rows() {
        let mut buf = Vec::new();
        write_execute(&mut buf);

        assert_eq!(buf[0], b'E');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len, 9);
    }

    #[test]
    fn sync_is_four_zero_length_bytes() {
        let mut buf = Vec::new();
        write_sync(&mut buf);

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'S');
        assert_eq!(&buf[1..5], &4_i32.to_be_bytes());
    }

    #[test]
    fn flush_is_four_zero_length_bytes() {
        let mut buf = Vec::new();
        write_flush(&mut buf);

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'H');
        assert_eq!(&buf[1..5], &4_i32.to_be_bytes());
    }
}
