//! The connection manager: accept, dispatch, teardown.
//!
//! A [`Server`] owns the reactor, the listening socket, and a slab of live
//! connections. [`Server::run`] is the only blocking loop in the process:
//! wait for a readiness batch, decode each event's token, and hand it to the
//! listener-accept path or the owning connection's handler. Teardown funnels
//! through one place and releases a connection's socket and timer together,
//! exactly once.

pub(crate) mod buffer;
pub(crate) mod conn;

use crate::http::response::Response;
use crate::http::routes;
use crate::net::listener;
use crate::reactor::core::{Interest, MAX_EVENTS, Reactor, Token};
use crate::reactor::event::Event;
use crate::reactor::io::sys_close;
use crate::reactor::timer::TimerFd;
use crate::server::conn::{ConnState, Connection, Verdict};
use crate::utils::slab::{Handle, Slab};

use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

/// Bound on the time to receive a complete request line, re-armed on every
/// successful read. Also bounds each stall of the write phase.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on the quiet gap between keep-alive exchanges.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// The per-connection timeout pair.
#[derive(Clone, Copy, Debug)]
pub struct Timeouts {
    pub read: Duration,
    pub idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: READ_TIMEOUT,
            idle: IDLE_TIMEOUT,
        }
    }
}

/// The default routing function.
pub type Router = fn(&str, &str) -> Response;

/// A single-threaded, edge-triggered HTTP server over non-blocking sockets.
pub struct Server<R = Router> {
    reactor: Reactor,
    listener: RawFd,
    conns: Slab<Connection>,
    route: R,
    timeouts: Timeouts,
}

impl Server {
    /// Binds a server with the canned route table and default timeouts.
    ///
    /// # Arguments
    /// * `address` - Address to bind to, format: "ip:port" (e.g., "0.0.0.0:8080")
    ///
    /// # Errors
    /// Any failure here is a setup failure: socket, bind, listen, or epoll
    /// creation. These are the only errors that may terminate the process.
    pub fn bind(address: &str) -> io::Result<Self> {
        Self::bind_with(address, routes::resolve as Router, Timeouts::default())
    }
}

impl<R> Server<R>
where
    R: Fn(&str, &str) -> Response,
{
    /// Binds a server with an explicit routing function and timeout pair.
    pub fn bind_with(address: &str, route: R, timeouts: Timeouts) -> io::Result<Self> {
        let reactor = Reactor::new()?;
        let fd = listener::bind_listener(address)?;

        if let Err(error) = reactor.register(fd, Interest::Readable, Token::Listener) {
            sys_close(fd);
            return Err(error);
        }

        Ok(Self {
            reactor,
            listener: fd,
            conns: Slab::new(),
            route,
            timeouts,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        listener::local_addr(self.listener)
    }

    /// Runs the wait/dispatch loop. Does not return in normal operation.
    ///
    /// Per-connection failures never escape this loop; only a broken wait
    /// call surfaces as an error.
    pub fn run(&mut self) -> io::Result<()> {
        let mut events = [Event::EMPTY; MAX_EVENTS];

        loop {
            let count = self.reactor.wait(&mut events)?;

            for event in events.iter().take(count).copied() {
                let Some(token) = Token::decode(event.token()) else {
                    continue;
                };

                match token {
                    Token::Listener => self.accept_pending(),
                    Token::ConnSocket(handle) => self.dispatch_socket(handle, event),
                    Token::ConnTimer(handle) => self.dispatch_timer(handle),
                }
            }
        }
    }

    /// Accepts peers until the backlog reports `WouldBlock`.
    ///
    /// A resource failure on one peer rejects that peer and keeps accepting;
    /// it never aborts the loop or the process.
    fn accept_pending(&mut self) {
        loop {
            let socket = match listener::accept_peer(self.listener) {
                Ok(fd) => fd,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return,
                Err(error) if listener::is_transient_accept_error(&error) => {
                    // Only the head-of-queue peer is gone; the rest of the
                    // backlog is still waiting.
                    tracing::debug!(%error, "peer vanished before accept");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                    return;
                }
            };

            if let Err(error) = Event::set_nonblocking(socket) {
                tracing::warn!(%error, "nonblocking setup failed, rejecting peer");
                sys_close(socket);
                continue;
            }

            let timer = match TimerFd::new() {
                Ok(timer) => timer,
                Err(error) => {
                    tracing::warn!(%error, "timer creation failed, rejecting peer");
                    sys_close(socket);
                    continue;
                }
            };

            timer.arm(self.timeouts.read);
            let timer_fd = timer.raw();

            let handle = self.conns.insert(Connection::new(socket, timer));

            let registered = self
                .reactor
                .register(timer_fd, Interest::TimerExpiry, Token::ConnTimer(handle))
                .and_then(|_| {
                    self.reactor
                        .register(socket, Interest::Readable, Token::ConnSocket(handle))
                });

            if let Err(error) = registered {
                tracing::warn!(%error, "registration failed, rejecting peer");
                self.teardown(handle);
                continue;
            }

            tracing::debug!(fd = socket, live = self.conns.len(), "accepted connection");
        }
    }

    fn dispatch_socket(&mut self, handle: Handle, event: Event) {
        // Error and hang-up conditions win over any other bits on the same
        // notification.
        if event.is_error() {
            self.teardown(handle);
            return;
        }

        let Some(conn) = self.conns.get_mut(handle) else {
            // Stale event for a slot already torn down this batch.
            return;
        };
        if conn.closed {
            return;
        }

        let verdict = match conn.state {
            ConnState::Reading if event.readable() => conn.handle_readable(
                &self.reactor,
                Token::ConnSocket(handle),
                &self.route,
                self.timeouts,
            ),
            ConnState::Writing if event.writable() => {
                conn.handle_writable(&self.reactor, Token::ConnSocket(handle), self.timeouts)
            }
            _ => Verdict::Keep,
        };

        if verdict == Verdict::Close {
            self.teardown(handle);
        }
    }

    fn dispatch_timer(&mut self, handle: Handle) {
        let Some(conn) = self.conns.get_mut(handle) else {
            return;
        };
        if conn.closed {
            return;
        }

        if conn.handle_timeout() == Verdict::Close {
            self.teardown(handle);
        }
    }

    /// Releases a connection: unregister socket and timer, then close both.
    ///
    /// Idempotent through the slab: a second call with the same handle finds
    /// the slot vacated and does nothing, so no descriptor is ever released
    /// twice.
    fn teardown(&mut self, handle: Handle) {
        let Some(mut conn) = self.conns.remove(handle) else {
            return;
        };

        conn.closed = true;
        self.reactor.unregister(conn.socket);
        self.reactor.unregister(conn.timer.raw());

        tracing::debug!(fd = conn.socket, live = self.conns.len(), "connection closed");
        // Dropping the connection closes both descriptors.
    }
}

impl<R> Drop for Server<R> {
    fn drop(&mut self) {
        sys_close(self.listener);
    }
}
