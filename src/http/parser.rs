//! Request-line tokenizer.
//!
//! The protocol is a minimal HTTP/1.1 subset: a single `METHOD SP PATH` line
//! terminated by CRLF. Headers are never structurally parsed; the only header
//! the server reacts to is a case-insensitive `connection: close` substring
//! anywhere in the buffered bytes.

use thiserror::Error;

/// Upper bound on the method and path tokens, in bytes.
pub const MAX_TOKEN_LEN: usize = 255;

/// Why a buffered request line could not be parsed.
///
/// [`ParseError::MissingDelimiter`] is recoverable while buffer space
/// remains — the line may simply not have arrived yet. Every other kind is a
/// protocol violation and closes the connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("request line delimiter not found")]
    MissingDelimiter,
    #[error("request line token exceeds {MAX_TOKEN_LEN} bytes")]
    TokenTooLong,
    #[error("request line has too few tokens")]
    TooFewTokens,
    #[error("request line is not valid UTF-8")]
    InvalidEncoding,
}

/// A parsed request line.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
}

/// Extracts the method and path tokens from buffered request bytes.
///
/// Parsing is segmentation-independent: the result depends only on the bytes
/// accumulated so far, never on how many reads delivered them.
pub fn parse_request_line(buf: &[u8]) -> Result<RequestLine<'_>, ParseError> {
    let end = buf
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(ParseError::MissingDelimiter)?;

    let mut tokens = buf[..end].split(|&b| b == b' ').filter(|t| !t.is_empty());

    let method = tokens.next().ok_or(ParseError::TooFewTokens)?;
    let path = tokens.next().ok_or(ParseError::TooFewTokens)?;

    if method.len() > MAX_TOKEN_LEN || path.len() > MAX_TOKEN_LEN {
        return Err(ParseError::TokenTooLong);
    }

    let method = std::str::from_utf8(method).map_err(|_| ParseError::InvalidEncoding)?;
    let path = std::str::from_utf8(path).map_err(|_| ParseError::InvalidEncoding)?;

    Ok(RequestLine { method, path })
}

/// Whether the buffered bytes carry an explicit close directive.
///
/// A case-insensitive substring check: the buffer is scanned as a whole, not
/// header by header.
pub fn wants_close(buf: &[u8]) -> bool {
    const DIRECTIVE: &[u8] = b"connection: close";

    buf.windows(DIRECTIVE.len())
        .any(|w| w.eq_ignore_ascii_case(DIRECTIVE))
}
