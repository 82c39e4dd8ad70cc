//! Per-connection state machine and its readiness handlers.
//!
//! A [`Connection`] owns exactly one peer socket and one timer for its whole
//! lifetime. Handlers run on the single dispatch thread, loop until the
//! kernel reports `WouldBlock` (edge-triggered delivery coalesces), and
//! report a [`Verdict`] back to the dispatch loop; teardown itself happens in
//! one place, in the server.

use crate::http::parser::{ParseError, parse_request_line, wants_close};
use crate::http::response::{Response, write_response};
use crate::reactor::core::{Interest, Reactor, Token};
use crate::reactor::io::{sys_close, sys_read, sys_write};
use crate::reactor::timer::TimerFd;
use crate::server::Timeouts;
use crate::server::buffer::FixedBuf;

use std::io;
use std::os::fd::RawFd;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ConnState {
    Reading,
    Writing,
}

/// What the dispatch loop should do with the connection afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Verdict {
    Keep,
    Close,
}

pub(crate) struct Connection {
    pub(crate) socket: RawFd,
    pub(crate) timer: TimerFd,
    pub(crate) state: ConnState,
    pub(crate) closed: bool,
    read_buf: FixedBuf,
    write_buf: FixedBuf,
    sent: usize,
    keep_alive: bool,
}

impl Connection {
    pub(crate) fn new(socket: RawFd, timer: TimerFd) -> Self {
        Self {
            socket,
            timer,
            state: ConnState::Reading,
            closed: false,
            read_buf: FixedBuf::new(),
            write_buf: FixedBuf::new(),
            sent: 0,
            keep_alive: true,
        }
    }

    /// Drains readable data and, once a full request line is buffered,
    /// formats the response and flips the connection to the write phase.
    pub(crate) fn handle_readable<R>(
        &mut self,
        reactor: &Reactor,
        token: Token,
        route: &R,
        timeouts: Timeouts,
    ) -> Verdict
    where
        R: Fn(&str, &str) -> Response,
    {
        loop {
            let n = sys_read(self.socket, self.read_buf.spare_mut());

            if n > 0 {
                self.read_buf.add_len(n as usize);
                self.timer.arm(timeouts.read);

                if self.read_buf.is_full() {
                    tracing::debug!(fd = self.socket, "request too large");
                    return Verdict::Close;
                }

                let line = match parse_request_line(self.read_buf.as_slice()) {
                    Ok(line) => line,
                    // The line may simply not have arrived yet.
                    Err(ParseError::MissingDelimiter) => continue,
                    Err(error) => {
                        tracing::debug!(fd = self.socket, %error, "malformed request line");
                        return Verdict::Close;
                    }
                };

                self.keep_alive = !wants_close(self.read_buf.as_slice());
                let response = route(line.method, line.path);

                self.write_buf.clear();
                self.sent = 0;
                if write_response(&mut self.write_buf, &response, self.keep_alive).is_err() {
                    tracing::error!(
                        fd = self.socket,
                        status = response.status,
                        "formatted response exceeds write buffer capacity"
                    );
                    return Verdict::Close;
                }

                self.read_buf.clear();
                self.state = ConnState::Writing;
                // The write phase is bounded too: a peer that stops draining
                // its socket is timed out like a peer that stops sending.
                self.timer.arm(timeouts.read);

                if reactor
                    .reregister(self.socket, Interest::Writable, token)
                    .is_err()
                {
                    return Verdict::Close;
                }

                return Verdict::Keep;
            }

            if n == 0 {
                // Peer shut down its send side.
                return Verdict::Close;
            }

            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::WouldBlock {
                return Verdict::Keep;
            }

            tracing::warn!(fd = self.socket, %error, "read failed");
            return Verdict::Close;
        }
    }

    /// Pushes buffered response bytes out from the sent offset.
    ///
    /// On full drain a keep-alive connection resets for the next request; a
    /// non-keep-alive connection's drain is itself the close trigger.
    pub(crate) fn handle_writable(
        &mut self,
        reactor: &Reactor,
        token: Token,
        timeouts: Timeouts,
    ) -> Verdict {
        while self.sent < self.write_buf.len() {
            let n = sys_write(self.socket, &self.write_buf.as_slice()[self.sent..]);

            if n > 0 {
                self.sent += n as usize;
                self.timer.arm(timeouts.read);
                continue;
            }

            if n == 0 {
                return Verdict::Close;
            }

            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::WouldBlock {
                // Kernel buffer full; resume from `sent` on the next
                // writable notification.
                return Verdict::Keep;
            }

            tracing::warn!(fd = self.socket, %error, "write failed");
            return Verdict::Close;
        }

        if !self.keep_alive {
            return Verdict::Close;
        }

        self.read_buf.clear();
        self.write_buf.clear();
        self.sent = 0;
        self.state = ConnState::Reading;
        self.timer.arm(timeouts.idle);

        if reactor
            .reregister(self.socket, Interest::Readable, token)
            .is_err()
        {
            return Verdict::Close;
        }

        Verdict::Keep
    }

    /// Timer expiry is fatal: drain the expiration count and close.
    pub(crate) fn handle_timeout(&mut self) -> Verdict {
        self.timer.drain();
        tracing::debug!(fd = self.socket, "connection timed out");

        Verdict::Close
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        sys_close(self.socket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::event::Event;
    use crate::utils::slab::Handle;

    fn nonblocking_socketpair() -> (RawFd, RawFd) {
        let mut fds = [0i32; 2];
        let ret = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(ret, 0, "socketpair failed");

        Event::set_nonblocking(fds[0]).expect("set nonblocking");
        Event::set_nonblocking(fds[1]).expect("set nonblocking");

        (fds[0], fds[1])
    }

    fn drain(fd: RawFd, into: &mut Vec<u8>) {
        let mut buf = [0u8; 4096];
        loop {
            let n = sys_read(fd, &mut buf);
            if n <= 0 {
                return;
            }
            into.extend_from_slice(&buf[..n as usize]);
        }
    }

    #[test]
    fn suspended_write_resumes_from_sent_offset() {
        let reactor = Reactor::new().expect("reactor");
        let (socket, peer) = nonblocking_socketpair();
        let timer = TimerFd::new().expect("timer");

        let mut conn = Connection::new(socket, timer);
        let payload: Vec<u8> = (0..3000).map(|i| (i % 251) as u8).collect();
        conn.write_buf.extend(&payload).expect("stage response");
        conn.state = ConnState::Writing;

        let token = Token::ConnSocket(Handle {
            index: 0,
            generation: 0,
        });
        reactor
            .register(socket, Interest::Writable, token)
            .expect("register socket");

        // Fill the kernel send buffer so the next write reports WouldBlock.
        let junk = [0u8; 4096];
        let mut junk_total = 0usize;
        loop {
            let n = sys_write(socket, &junk);
            if n > 0 {
                junk_total += n as usize;
                continue;
            }
            assert_eq!(
                io::Error::last_os_error().kind(),
                io::ErrorKind::WouldBlock,
                "expected a full send buffer"
            );
            break;
        }

        // The handler suspends without losing its position or its state.
        let verdict = conn.handle_writable(&reactor, token, Timeouts::default());
        assert_eq!(verdict, Verdict::Keep);
        assert_eq!(conn.state, ConnState::Writing);
        assert!(conn.sent < conn.write_buf.len());

        // Drain the peer to free buffer space and resume until the response
        // is fully pushed; each resume picks up from the preserved offset.
        let mut received = Vec::new();
        let mut rounds = 0;
        while conn.state == ConnState::Writing {
            rounds += 1;
            assert!(rounds <= 64, "write phase never completed");

            drain(peer, &mut received);
            let verdict = conn.handle_writable(&reactor, token, Timeouts::default());
            assert_eq!(verdict, Verdict::Keep);
        }
        drain(peer, &mut received);

        // Everything before the response is the junk fill; the response
        // itself arrives in order, complete, with no duplication.
        assert_eq!(received.len(), junk_total + payload.len());
        assert!(received[..junk_total].iter().all(|&b| b == 0));
        assert_eq!(&received[junk_total..], &payload[..]);

        sys_close(peer);
    }
}
