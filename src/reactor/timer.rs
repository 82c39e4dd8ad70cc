//! One-shot timerfd wrapper.
//!
//! Each connection owns one [`TimerFd`] for the whole of its lifetime. The
//! timer is re-armed explicitly at the points that bound the connection's
//! latency, and its expiry is delivered through the reactor as an ordinary
//! readiness event on the timer descriptor.

use crate::reactor::io::{sys_close, sys_read};

use libc::{CLOCK_MONOTONIC, TFD_NONBLOCK, itimerspec, timerfd_create, timerfd_settime, timespec};
use std::io;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// A one-shot countdown backed by a timerfd descriptor.
///
/// Arming supersedes any pending expiry. The descriptor is closed when the
/// wrapper is dropped.
pub(crate) struct TimerFd {
    fd: RawFd,
}

impl TimerFd {
    /// Creates a new disarmed timer.
    ///
    /// Failure here rejects a single peer, never the process.
    pub(crate) fn new() -> io::Result<Self> {
        let fd = unsafe { timerfd_create(CLOCK_MONOTONIC, TFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { fd })
    }

    /// Arms the timer to expire once after `timeout`, replacing any pending
    /// expiry.
    pub(crate) fn arm(&self, timeout: Duration) {
        let spec = itimerspec {
            it_interval: timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
            it_value: timespec {
                tv_sec: timeout.as_secs() as libc::time_t,
                tv_nsec: timeout.subsec_nanos() as libc::c_long,
            },
        };

        unsafe {
            timerfd_settime(self.fd, 0, &spec, ptr::null_mut());
        }
    }

    /// Consumes the pending expiration count.
    pub(crate) fn drain(&self) {
        let mut expirations = [0u8; 8];
        sys_read(self.fd, &mut expirations);
    }

    pub(crate) fn raw(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TimerFd {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}
