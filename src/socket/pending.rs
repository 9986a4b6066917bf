use std::os::fd::{OwnedFd, AsRawFd, IntoRawFd};
use tracing::{debug, error, trace};
use crate::addr::SocketAddrV4;
use crate::error::{SocketError, errno};
use super::{Transport, options};
use super::connected::ConnectedSocket;
use super::raw::{SockName, sock_name};

/// A socket whose non-blocking connect has been initiated.
///
/// This is the Connecting state. Poll it until it reports completion,
/// then turn it into a [`ConnectedSocket`]. A poll error is the Failed
/// state: drop the handle.
pub struct PendingConnect {
	fd: OwnedFd,
	transport: Transport,
	peer: SocketAddrV4,
}

/// Outcome of [`PendingConnect::poll`].
pub enum ConnectPoll {
	/// Still connecting; poll again later.
	Pending(PendingConnect),
	/// Connected and ready for I/O.
	Ready(ConnectedSocket),
}

impl ConnectPoll {
	pub fn is_ready(&self) -> bool {
		matches!(self, ConnectPoll::Ready(_))
	}
}

impl PendingConnect {
	pub(crate) fn from_parts(fd: OwnedFd, transport: Transport, peer: SocketAddrV4) -> Self {
		Self { fd, transport, peer }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	#[inline]
	pub fn transport(&self) -> Transport {
		self.transport
	}

	/// The address passed to connect.
	#[inline]
	pub fn peer_addr(&self) -> SocketAddrV4 {
		self.peer
	}

	/// The ephemeral local address reserved at creation.
	pub fn local_addr(&self) -> std::io::Result<SocketAddrV4> {
		sock_name(self, SockName::Local)
	}

	/// Zero-timeout readiness check for connect completion.
	///
	/// Single pass, level-triggered: call it again until it returns
	/// `Ok(true)` or an error. `Ok(false)` means not yet.
	///
	/// A socket reporting POLLERR/POLLHUP, or a writable socket with a
	/// pending SO_ERROR, has failed to connect and yields
	/// `SocketError::Connect` carrying the socket's errno.
	pub fn is_create_complete(&self) -> std::io::Result<bool> {
		let mut pfd = libc::pollfd {
			fd: self.as_raw_fd(),
			events: libc::POLLOUT,
			revents: 0,
		};

		let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
		if ready == -1 {
			let e = errno();
			if e == libc::EINTR {
				trace!(fd = self.as_raw_fd(), "poll interrupted");
				return Ok(false);
			}
			error!(fd = self.as_raw_fd(), errno = e, "socket poll failed");
			return Err(SocketError::Poll { errno: e }.into());
		}
		if ready == 0 {
			return Ok(false);
		}

		let failed = pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0;
		if failed || pfd.revents & libc::POLLOUT != 0 {
			let pending = options::take_socket_error(self).inspect_err(|err| {
				error!(fd = self.as_raw_fd(), error = %err, "reading SO_ERROR failed");
			})?;
			if failed || pending != 0 {
				// POLLERR/POLLHUP without SO_ERROR: the kernel already consumed it.
				let e = match pending {
					0 if pfd.revents & libc::POLLNVAL != 0 => libc::EBADF,
					0 => libc::ECONNREFUSED,
					e => e,
				};
				error!(fd = self.as_raw_fd(), peer = %self.peer, errno = e, revents = pfd.revents, "socket connect failed");
				return Err(SocketError::Connect {
					errno: e,
					addr: self.peer.to_string(),
				}.into());
			}
			debug!(fd = self.as_raw_fd(), peer = %self.peer, "connect complete");
			return Ok(true);
		}

		Ok(false)
	}

	/// Two-phase form of [`is_create_complete`](Self::is_create_complete).
	///
	/// Consumes the handle and gives it back as `Pending` or promotes it to
	/// `Ready`. On error the descriptor is closed.
	pub fn poll(self) -> std::io::Result<ConnectPoll> {
		if self.is_create_complete()? {
			Ok(ConnectPoll::Ready(self.finish()))
		} else {
			Ok(ConnectPoll::Pending(self))
		}
	}

	/// Promotes to a connected socket without checking.
	///
	/// Only call after `is_create_complete()` returned `Ok(true)`.
	pub fn finish(self) -> ConnectedSocket {
		ConnectedSocket::from_parts(self.fd, self.transport)
	}

	/// Closes the socket.
	pub fn destroy(self) {
		debug!(fd = self.as_raw_fd(), "destroying pending socket");
		drop(self);
	}
}

impl std::os::fd::AsRawFd for PendingConnect {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for PendingConnect {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl IntoRawFd for PendingConnect {
	fn into_raw_fd(self) -> std::os::fd::RawFd {
		self.fd.into_raw_fd()
	}
}
