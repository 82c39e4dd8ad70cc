//! Listening socket creation and accept for raw descriptors.
//!
//! The listener is plain plumbing around the server core: it produces a bound,
//! listening, non-blocking socket and hands out accepted peer descriptors one
//! at a time. Any failure in here during setup is fatal to the process;
//! failures during accept affect a single peer only.

use crate::reactor::event::Event;

use libc::{
    AF_INET, SO_REUSEADDR, SOCK_STREAM, SOL_SOCKET, SOMAXCONN, accept, bind, getsockname, listen,
    setsockopt, sockaddr, sockaddr_in, socket, socklen_t,
};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::fd::RawFd;
use std::ptr;

/// Binds a non-blocking listening socket to the given address.
///
/// This performs the following:
/// 1. Creates a new IPv4 TCP socket with `SO_REUSEADDR`
/// 2. Sets it to non-blocking mode
/// 3. Binds to the specified address
/// 4. Starts listening with the system-default backlog
///
/// # Arguments
/// * `address` - Address to bind to, format: "ip:port" (e.g., "0.0.0.0:8080")
///
/// # Returns
/// The listening descriptor on success, or an I/O error
pub(crate) fn bind_listener(address: &str) -> io::Result<RawFd> {
    let addr = parse_sockaddr(address)?;

    let fd = unsafe { socket(AF_INET, SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    let opt: libc::c_int = 1;
    unsafe {
        setsockopt(
            fd,
            SOL_SOCKET,
            SO_REUSEADDR,
            &opt as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as socklen_t,
        );
    }

    if let Err(error) = Event::set_nonblocking(fd) {
        crate::reactor::io::sys_close(fd);
        return Err(error);
    }

    let ret = unsafe {
        bind(
            fd,
            &addr as *const _ as *const sockaddr,
            mem::size_of::<sockaddr_in>() as socklen_t,
        )
    };
    if ret < 0 {
        let error = io::Error::last_os_error();
        crate::reactor::io::sys_close(fd);
        return Err(error);
    }

    let ret = unsafe { listen(fd, SOMAXCONN) };
    if ret < 0 {
        let error = io::Error::last_os_error();
        crate::reactor::io::sys_close(fd);
        return Err(error);
    }

    Ok(fd)
}

/// Returns the local address the descriptor is bound to.
///
/// Binding to port 0 picks an ephemeral port; this recovers it.
pub(crate) fn local_addr(fd: RawFd) -> io::Result<SocketAddr> {
    let mut addr: sockaddr_in = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_in>() as socklen_t;

    let ret = unsafe { getsockname(fd, &mut addr as *mut _ as *mut sockaddr, &mut len) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)),
        u16::from_be(addr.sin_port),
    )))
}

/// Accepts one pending peer.
///
/// # Returns
/// The peer descriptor, or `WouldBlock` when the backlog is empty. The caller
/// loops until `WouldBlock`: edge-triggered delivery coalesces multiple
/// pending peers into a single notification.
pub(crate) fn accept_peer(listener: RawFd) -> io::Result<RawFd> {
    let fd = unsafe { accept(listener, ptr::null_mut(), ptr::null_mut()) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(fd)
}

/// Whether an accept failure concerns only the peer at the head of the
/// backlog.
///
/// A peer can reset its connection between arrival and accept; the queue
/// behind it is unaffected and the accept loop should keep going rather than
/// wait for the next listener edge.
pub(crate) fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::ECONNABORTED) | Some(libc::EPROTO) | Some(libc::EINTR)
    )
}

fn parse_sockaddr(address: &str) -> io::Result<sockaddr_in> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid socket address"))?;

    let SocketAddr::V4(v4) = addr else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "only IPv4 addresses are supported",
        ));
    };

    let mut out: sockaddr_in = unsafe { mem::zeroed() };
    out.sin_family = AF_INET as libc::sa_family_t;
    out.sin_port = v4.port().to_be();
    out.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_accept_errors_only_skip_one_peer() {
        for errno in [libc::ECONNABORTED, libc::EPROTO, libc::EINTR] {
            assert!(is_transient_accept_error(&io::Error::from_raw_os_error(
                errno
            )));
        }

        for errno in [libc::EAGAIN, libc::EMFILE, libc::ENFILE, libc::EBADF] {
            assert!(!is_transient_accept_error(&io::Error::from_raw_os_error(
                errno
            )));
        }
    }
}
