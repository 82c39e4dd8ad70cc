//! The reactor: descriptor registration and blocking demultiplexing.
//!
//! The [`Reactor`] owns the process's single epoll instance. Every registered
//! descriptor carries a [`Token`] identifying what it is — the listener, a
//! connection's socket, or a connection's timer — so the dispatch loop never
//! branches on raw descriptor equality and never follows raw pointers stored
//! in event payloads. Connection tokens embed a generational [`Handle`]: an
//! event that outlives its connection decodes to a handle the slab no longer
//! recognizes and is discarded.

use crate::reactor::event::Event;
use crate::utils::slab::{GENERATION_MASK, Handle};

use libc::{EPOLLET, EPOLLIN, EPOLLOUT, epoll_create1};
use std::io;
use std::os::fd::RawFd;

/// Maximum number of events retrieved per wait call.
pub(crate) const MAX_EVENTS: usize = 64;

/// The interest a descriptor is registered under.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Interest {
    /// Edge-triggered read readiness, for sockets.
    Readable,
    /// Edge-triggered write readiness, for sockets.
    Writable,
    /// Level-triggered read readiness, for timer descriptors. A timer fires
    /// once and its handler closes the connection, so edge semantics buy
    /// nothing here.
    TimerExpiry,
}

impl Interest {
    fn bits(self) -> u32 {
        match self {
            Interest::Readable => (EPOLLIN | EPOLLET) as u32,
            Interest::Writable => (EPOLLOUT | EPOLLET) as u32,
            Interest::TimerExpiry => EPOLLIN as u32,
        }
    }
}

/// Identity of a registered descriptor, recovered at dispatch time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Token {
    Listener,
    ConnSocket(Handle),
    ConnTimer(Handle),
}

// u64 payload layout: [tag:2][generation:31][index:31].
const TAG_LISTENER: u64 = 0;
const TAG_SOCKET: u64 = 1;
const TAG_TIMER: u64 = 2;

impl Token {
    pub(crate) fn encode(self) -> u64 {
        match self {
            Token::Listener => TAG_LISTENER << 62,
            Token::ConnSocket(handle) => TAG_SOCKET << 62 | pack(handle),
            Token::ConnTimer(handle) => TAG_TIMER << 62 | pack(handle),
        }
    }

    pub(crate) fn decode(raw: u64) -> Option<Token> {
        match raw >> 62 {
            TAG_LISTENER => Some(Token::Listener),
            TAG_SOCKET => Some(Token::ConnSocket(unpack(raw))),
            TAG_TIMER => Some(Token::ConnTimer(unpack(raw))),
            _ => None,
        }
    }
}

fn pack(handle: Handle) -> u64 {
    ((handle.generation & GENERATION_MASK) as u64) << 31 | (handle.index & GENERATION_MASK) as u64
}

fn unpack(raw: u64) -> Handle {
    Handle {
        index: (raw & GENERATION_MASK as u64) as u32,
        generation: (raw >> 31) as u32 & GENERATION_MASK,
    }
}

/// Owner of the epoll instance.
///
/// Created once at startup; the kernel reclaims the descriptor at process
/// exit, and [`Drop`] closes it for transient instances in tests.
pub(crate) struct Reactor {
    epoll: RawFd,
}

impl Reactor {
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(0) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { epoll })
    }

    pub(crate) fn register(&self, fd: RawFd, interest: Interest, token: Token) -> io::Result<()> {
        Event::register(self.epoll, fd, interest.bits(), token.encode())
    }

    pub(crate) fn reregister(&self, fd: RawFd, interest: Interest, token: Token) -> io::Result<()> {
        Event::modify(self.epoll, fd, interest.bits(), token.encode())
    }

    pub(crate) fn unregister(&self, fd: RawFd) {
        Event::unregister(self.epoll, fd);
    }

    /// Blocks until at least one registered descriptor is ready.
    ///
    /// Returns the number of events written into `events`, in the kernel's
    /// delivery order.
    pub(crate) fn wait(&self, events: &mut [Event; MAX_EVENTS]) -> io::Result<usize> {
        Event::wait(self.epoll, events)
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        crate::reactor::io::sys_close(self.epoll);
    }
}
