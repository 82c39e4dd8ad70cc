//! Event-driven I/O reactor module.
//!
//! Core readiness handling using epoll on Linux. It includes:
//! - [`core`]: the reactor, its interest sets, and the token scheme
//! - [`event`]: epoll event wrappers
//! - [`timer`]: one-shot timerfd wrapper
//! - [`io`]: raw file descriptor syscall shims

pub(crate) mod core;
pub(crate) mod event;
pub(crate) mod io;
pub(crate) mod timer;
