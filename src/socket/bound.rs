use std::os::fd::{OwnedFd, AsRawFd};
use tracing::{debug, error};
use crate::addr::{SocketAddrV4, ToSockAddr};
use crate::error::{SocketError, errno};
use super::Transport;
use super::pending::PendingConnect;
use super::raw::{SockName, sock_name};

/// A socket that holds a local address but has not started connecting.
///
/// Same structure as RawSocket. Different name = different capabilities.
pub struct BoundSocket {
	fd: OwnedFd,
	transport: Transport,
}

impl BoundSocket {
	/// Internal use only - called by RawSocket::bind()
	pub(crate) fn from_parts(fd: OwnedFd, transport: Transport) -> Self {
		Self { fd, transport }
	}

	/// Returns the raw file descriptor.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	#[inline]
	pub fn transport(&self) -> Transport {
		self.transport
	}

	/// The address the kernel assigned at bind time.
	pub fn local_addr(&self) -> std::io::Result<SocketAddrV4> {
		sock_name(self, SockName::Local)
	}

	/// Starts a non-blocking connection.
	///
	/// The socket must already be non-blocking. `EINPROGRESS` is the normal
	/// outcome and counts as success; an immediate `0` (UDP, or a loopback
	/// handshake that won the race) is success too. Anything else fails.
	pub fn connect_nonblocking(self, addr: SocketAddrV4) -> std::io::Result<PendingConnect> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(self.as_raw_fd(), ptr, len)
		});

		if result == 0 {
			debug!(fd = self.as_raw_fd(), %addr, "connect completed immediately");
			return Ok(PendingConnect::from_parts(self.fd, self.transport, addr));
		}

		let e = errno();
		if e == libc::EINPROGRESS {
			debug!(fd = self.as_raw_fd(), %addr, "connect in progress");
			Ok(PendingConnect::from_parts(self.fd, self.transport, addr))
		} else {
			error!(%addr, errno = e, "socket connect failed, not EINPROGRESS");
			Err(SocketError::Connect {
				errno: e,
				addr: addr.to_string(),
			}.into())
		}
	}
}

impl std::os::fd::AsRawFd for BoundSocket {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for BoundSocket {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}
