//! The canned route table.
//!
//! Routing is deliberately a plain function from `(method, path)` to a
//! [`Response`]; the server core is generic over any such function and this
//! table is merely the default. There is no registration surface.

use crate::http::response::Response;

/// Resolves a request to a response.
///
/// Any non-GET method yields 405 regardless of path; unknown paths yield 404.
pub fn resolve(method: &str, path: &str) -> Response {
    if method != "GET" {
        return Response::new(405, "Method Not Allowed", &b"Only GET supported\n"[..]);
    }

    match path {
        "/" => Response::new(200, "OK", &b"welcome to the server\n"[..]),
        "/health" => Response::new(200, "OK", &b"OK\n"[..]),
        "/hello" => Response::new(200, "OK", &b"hello, user!\n"[..]),
        _ => Response::new(404, "Not Found", &b"404 not found\n"[..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_routes() {
        assert_eq!(resolve("GET", "/").body, b"welcome to the server\n");
        assert_eq!(resolve("GET", "/health").body, b"OK\n");
        assert_eq!(resolve("GET", "/hello").body, b"hello, user!\n");
    }

    #[test]
    fn unknown_path_is_404() {
        let response = resolve("GET", "/missing");
        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"404 not found\n");
    }

    #[test]
    fn non_get_is_405_on_every_path() {
        for path in ["/", "/health", "/missing"] {
            let response = resolve("POST", path);
            assert_eq!(response.status, 405);
            assert_eq!(response.body, b"Only GET supported\n");
        }
    }
}
