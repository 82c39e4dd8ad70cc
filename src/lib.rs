//! Single-threaded, readiness-driven HTTP/1.1 micro-server.
//!
//! This crate serves a minimal HTTP subset over non-blocking TCP sockets,
//! driven entirely by edge-triggered epoll notifications on one thread.
//!
//! # Architecture
//!
//! - **Reactor**: owner of the epoll instance; registration, interest
//!   switching, and the only blocking wait call
//! - **Server**: accept loop, event dispatch by token, connection teardown
//! - **Connection**: per-peer state machine over {Reading, Writing} with
//!   bounded buffers and a one-shot timerfd deadline
//! - **Parser / Response builder**: pure request-line tokenizing and wire
//!   formatting
//! - **Slab**: generational arena so a stale readiness event can never reach
//!   a freed connection
//!
//! # Example
//!
//! ```ignore
//! use ember::Server;
//!
//! fn main() -> std::io::Result<()> {
//!     let mut server = Server::bind("0.0.0.0:8080")?;
//!     server.run()
//! }
//! ```

pub mod http;
mod net;
mod reactor;
mod server;
mod utils;

pub use http::response::Response;
pub use server::buffer::{BUF_CAPACITY, BufferError};
pub use server::{IDLE_TIMEOUT, READ_TIMEOUT, Router, Server, Timeouts};
