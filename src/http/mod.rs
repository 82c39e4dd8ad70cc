//! Minimal HTTP/1.1 subset: request-line parsing and response formatting.

pub mod parser;
pub mod response;
pub mod routes;

pub use parser::{ParseError, RequestLine, parse_request_line, wants_close};
pub use response::Response;
