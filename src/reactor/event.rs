//! epoll event wrapper and operations.
//!
//! This module wraps the libc epoll_event structure and provides convenient
//! methods for registering descriptors and waiting for readiness.
//!
//! # Event Types
//!
//! The module supports:
//! - Read readiness (EPOLLIN): data is available, or a peer is pending accept
//! - Write readiness (EPOLLOUT): the socket can take more outgoing bytes
//! - Error conditions (EPOLLERR/EPOLLHUP): the descriptor is no longer usable
//!
//! Sockets are registered edge-triggered (EPOLLET): a notification fires once
//! per transition to ready, so consumers must drain until `WouldBlock`.

use libc::{
    EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, F_GETFL,
    F_SETFL, O_NONBLOCK, epoll_ctl, epoll_event, epoll_wait, fcntl,
};
use std::io;
use std::os::fd::RawFd;
use std::ptr;

/// Wrapper around an epoll event (epoll_event structure).
///
/// Provides a safe interface for inspecting delivered readiness notifications.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Event(epoll_event);

impl Event {
    /// An empty event constant used for array initialization.
    pub(crate) const EMPTY: Self = Self(epoll_event { events: 0, u64: 0 });

    /// Gets the token this event was registered under.
    pub(crate) fn token(&self) -> u64 {
        self.0.u64
    }

    /// Whether the descriptor is readable.
    pub(crate) fn readable(&self) -> bool {
        self.0.events & EPOLLIN as u32 != 0
    }

    /// Whether the descriptor is writable.
    pub(crate) fn writable(&self) -> bool {
        self.0.events & EPOLLOUT as u32 != 0
    }

    /// Whether the descriptor reported an error or hang-up condition.
    ///
    /// Such events force teardown regardless of any other bits set on the
    /// same notification.
    pub(crate) fn is_error(&self) -> bool {
        self.0.events & (EPOLLERR | EPOLLHUP) as u32 != 0
    }

    /// Registers a descriptor with the epoll instance.
    ///
    /// # Arguments
    /// * `epoll` - The epoll file descriptor
    /// * `fd` - The descriptor to register
    /// * `events` - The interest bit set (EPOLLIN/EPOLLOUT, optionally EPOLLET)
    /// * `token` - Opaque payload delivered back with each notification
    pub(crate) fn register(epoll: RawFd, fd: RawFd, events: u32, token: u64) -> io::Result<()> {
        let mut event = epoll_event { events, u64: token };

        let ret = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Replaces the interest set of an already registered descriptor.
    pub(crate) fn modify(epoll: RawFd, fd: RawFd, events: u32, token: u64) -> io::Result<()> {
        let mut event = epoll_event { events, u64: token };

        let ret = unsafe { epoll_ctl(epoll, EPOLL_CTL_MOD, fd, &mut event) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Unregisters a descriptor from the epoll instance.
    ///
    /// Errors are ignored: the teardown path may pass a descriptor whose
    /// registration never completed.
    pub(crate) fn unregister(epoll: RawFd, fd: RawFd) {
        unsafe {
            epoll_ctl(epoll, EPOLL_CTL_DEL, fd, ptr::null_mut());
        }
    }

    /// Waits for events, blocking until at least one descriptor is ready.
    ///
    /// Interrupted waits (EINTR) are retried.
    ///
    /// # Returns
    /// The number of events written into `events`
    pub(crate) fn wait(epoll: RawFd, events: &mut [Event]) -> io::Result<usize> {
        loop {
            let n = unsafe {
                epoll_wait(
                    epoll,
                    events.as_mut_ptr() as *mut epoll_event,
                    events.len() as i32,
                    -1,
                )
            };

            if n >= 0 {
                return Ok(n as usize);
            }

            let error = io::Error::last_os_error();
            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error);
            }
        }
    }

    /// Sets a file descriptor to non-blocking mode.
    ///
    /// A descriptor left blocking would stall the dispatch thread inside a
    /// handler's drain loop, so failure here must reject the descriptor.
    pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
        let flags = unsafe { fcntl(fd, F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }

        let ret = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_nonblocking_reports_bad_descriptor() {
        assert!(Event::set_nonblocking(-1).is_err());
    }

    #[test]
    fn set_nonblocking_flags_live_descriptor() {
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        Event::set_nonblocking(fds[0]).expect("set nonblocking");

        let flags = unsafe { libc::fcntl(fds[0], libc::F_GETFL) };
        assert!(flags & libc::O_NONBLOCK != 0);

        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }
}
