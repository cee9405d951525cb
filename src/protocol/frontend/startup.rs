//! `StartupMessage` and `Terminate`.

use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (major 3, minor 0).
pub const PROTOCOL_VERSION_3_0: i32 = 196_608;

/// Write the initial `StartupMessage`: no type byte, just length, protocol
/// version, then null-terminated key/value pairs, then a final NUL.
pub fn write_startup(buf: &mut Vec<u8>, params: &[(&str, &str)]) {
    let mut msg = MessageBuilder::new_untyped(buf);
    msg.write_i32(PROTOCOL_VERSION_3_0);
    for (name, value) in params {
        msg.write_cstr(name);
        msg.write_cstr(value);
    }
    msg.write_u8(0);
    msg.finish();
}

/// Write a `Terminate` message, the clean way to end a connection.
pub fn write_terminate(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, super::msg_type::TERMINATE).finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_carries_protocol_version_and_params() {
        let mut buf = Vec::new();
        write_startup(&mut buf, &[("user", "postgres"), ("database", "test")]);

        let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, buf.len());

        let version = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(version, PROTOCOL_VERSION_3_0);
        assert_eq!(&buf[8..], b"user\0postgres\0database\0test\0\0");
    }

    #[test]
    fn terminate_is_four_zero_length_bytes() {
        let mut buf = Vec::new();
        write_terminate(&mut buf);

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'X');
        assert_eq!(&buf[1..5], &4_i32.to_be_bytes());
    }
}
