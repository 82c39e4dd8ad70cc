//! Response formatting.
//!
//! A pure step: given a resolved route and the connection's keep-alive
//! decision, format the full wire response into the connection's write buffer.

use crate::server::buffer::{BufferError, FixedBuf};

/// A resolved response: status, reason phrase, and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, reason: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason,
            body: body.into(),
        }
    }
}

/// Formats `response` into `buf`.
///
/// Wire shape:
///
/// ```text
/// HTTP/1.1 <status> <reason>\r\n
/// content-length: <n>\r\n
/// content-type: text/plain\r\n
/// connection: keep-alive|close\r\n
/// \r\n
/// <body>
/// ```
///
/// The formatted size is checked against the buffer's remaining capacity
/// before anything is written: a response that does not fit fails whole
/// rather than being truncated on the wire.
pub fn write_response(
    buf: &mut FixedBuf,
    response: &Response,
    keep_alive: bool,
) -> Result<(), BufferError> {
    let connection = if keep_alive { "keep-alive" } else { "close" };

    let head = format!(
        "HTTP/1.1 {} {}\r\ncontent-length: {}\r\ncontent-type: text/plain\r\nconnection: {}\r\n\r\n",
        response.status,
        response.reason,
        response.body.len(),
        connection,
    );

    if head.len() + response.body.len() > buf.remaining() {
        return Err(BufferError::Overflow);
    }

    buf.extend(head.as_bytes())?;
    buf.extend(&response.body)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::buffer::BUF_CAPACITY;

    #[test]
    fn formats_keep_alive_response() {
        let mut buf = FixedBuf::new();
        let response = Response::new(200, "OK", &b"OK\n"[..]);

        write_response(&mut buf, &response, true).unwrap();

        assert_eq!(
            buf.as_slice(),
            b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\ncontent-type: text/plain\r\nconnection: keep-alive\r\n\r\nOK\n"
        );
    }

    #[test]
    fn formats_close_response() {
        let mut buf = FixedBuf::new();
        let response = Response::new(404, "Not Found", &b"404 not found\n"[..]);

        write_response(&mut buf, &response, false).unwrap();

        let text = std::str::from_utf8(buf.as_slice()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("\r\nconnection: close\r\n"));
        assert!(text.contains("\r\ncontent-length: 14\r\n"));
        assert!(text.ends_with("\r\n\r\n404 not found\n"));
    }

    #[test]
    fn oversized_response_fails_whole() {
        let mut buf = FixedBuf::new();
        let response = Response::new(200, "OK", vec![b'x'; BUF_CAPACITY]);

        assert_eq!(
            write_response(&mut buf, &response, true),
            Err(BufferError::Overflow)
        );
        // Nothing was written on failure.
        assert!(buf.as_slice().is_empty());
    }
}
