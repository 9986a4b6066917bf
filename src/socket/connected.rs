use std::os::fd::{OwnedFd, AsRawFd, IntoRawFd};
use tracing::{debug, error, trace};
use crate::addr::SocketAddrV4;
use crate::error::{SocketError, IoError, errno, is_transient};
use super::Transport;
use super::raw::{SockName, sock_name};

/// A connected, non-blocking TCP or UDP socket.
///
/// Every transfer is a single syscall that never waits. "Would block" is
/// not an error: it comes back as `Ok(0)` so callers can busy-poll, and
/// real failures come back as `Err`.
pub struct ConnectedSocket {
	fd: OwnedFd,
	transport: Transport,
}

impl ConnectedSocket {
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

	pub fn local_addr(&self) -> std::io::Result<SocketAddrV4> {
		sock_name(self, SockName::Local)
	}

	pub fn peer_addr(&self) -> std::io::Result<SocketAddrV4> {
		sock_name(self, SockName::Peer)
	}

	/// Attempts one non-blocking send.
	///
	/// Returns how many bytes the kernel accepted, which may be fewer than
	/// `buf.len()`; resubmit the rest later. An empty `buf` is `Ok(0)`
	/// without touching the socket, as is a full send buffer.
	pub fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}

		let n = unsafe {
			libc::send(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				libc::MSG_NOSIGNAL,
			)
		};

		if n == -1 {
			let e = errno();
			if is_transient(e) {
				trace!(fd = self.as_raw_fd(), errno = e, "send would block");
				return Ok(0);
			}
			error!(fd = self.as_raw_fd(), errno = e, "unexpected send error");
			return Err(IoError::Write { errno: e }.into());
		}

		trace!(fd = self.as_raw_fd(), sent = n, requested = buf.len(), "send");
		Ok(n as usize)
	}

	/// Attempts one non-blocking receive into `buf`.
	///
	/// Returns how many bytes were placed into `buf`. `Ok(0)` means nothing
	/// was available. Unlike [`send`](Self::send), an empty `buf` is a
	/// parameter error.
	pub fn receive(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		if buf.is_empty() {
			error!(fd = self.as_raw_fd(), "receive called with an empty buffer");
			return Err(SocketError::InvalidParameter { reason: "receive buffer is empty" }.into());
		}

		let n = unsafe {
			libc::recv(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
			)
		};

		if n == -1 {
			let e = errno();
			if is_transient(e) {
				trace!(fd = self.as_raw_fd(), errno = e, "receive would block");
				return Ok(0);
			}
			error!(fd = self.as_raw_fd(), errno = e, "unexpected recv error");
			return Err(IoError::Read { errno: e }.into());
		}

		trace!(fd = self.as_raw_fd(), received = n, capacity = buf.len(), "receive");
		Ok(n as usize)
	}

	/// Closes the socket.
	pub fn destroy(self) {
		debug!(fd = self.as_raw_fd(), "destroying socket");
		drop(self);
	}
}

impl std::os::fd::AsRawFd for ConnectedSocket {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for ConnectedSocket {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl IntoRawFd for ConnectedSocket {
	fn into_raw_fd(self) -> std::os::fd::RawFd {
		self.fd.into_raw_fd()
	}
}
