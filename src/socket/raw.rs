use std::os::fd::{OwnedFd, FromRawFd, AsRawFd};
use tracing::error;
use crate::addr::{SocketAddrV4, ToSockAddr, FromSockAddr};
use crate::error::{SocketError, errno};
use super::{Transport, options};
use super::bound::BoundSocket;

/// An `AF_INET` socket that has been created but not yet bound.
///
/// This is the starting point for all socket operations.
/// Use `.bind()` to reserve a local port.
pub struct RawSocket {
	fd: OwnedFd,
	transport: Transport,
}

impl RawSocket {
	/// Creates a new raw socket.
	///
	/// Calls the `socket()` syscall with `AF_INET` and the transport's type.
	/// The socket is created with `SOCK_CLOEXEC` (close on exec).
	pub fn new(transport: Transport) -> std::io::Result<Self> {
		let fd = unsafe {
			libc::socket(libc::AF_INET, transport.raw() | libc::SOCK_CLOEXEC, 0)
		};
		if fd == -1 {
			let errno = errno();
			error!(?transport, errno, "create socket failed");
			return Err(SocketError::Create { errno }.into());
		}
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };

		Ok(Self { fd, transport })
	}

	/// Returns the raw file descriptor.
	///
	/// Used internally for syscalls. Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	#[inline]
	pub fn transport(&self) -> Transport {
		self.transport
	}

	/// Sets the socket to non-blocking mode.
	pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
		options::set_nonblocking(self, nonblocking)
	}

	/// Binds the socket to an address.
	///
	/// Consumes self, returns BoundSocket.
	pub fn bind(self, addr: SocketAddrV4) -> std::io::Result<BoundSocket> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		});

		if result == -1 {
			let errno = errno();
			error!(%addr, errno, "bind socket failed");
			return Err(SocketError::Bind {
				errno,
				addr: addr.to_string(),
			}.into());
		}
		Ok(BoundSocket::from_parts(self.fd, self.transport))
	}
}

/// Which end of the socket to name.
#[derive(Clone, Copy)]
pub(crate) enum SockName {
	Local,
	Peer,
}

/// Reads the local (`getsockname`) or remote (`getpeername`) address.
pub(crate) fn sock_name<S: AsRawFd>(socket: &S, which: SockName) -> std::io::Result<SocketAddrV4> {
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
	let ptr = &mut storage as *mut _ as *mut libc::sockaddr;

	let (result, option) = match which {
		SockName::Local => (unsafe { libc::getsockname(socket.as_raw_fd(), ptr, &mut len) }, "getsockname"),
		SockName::Peer => (unsafe { libc::getpeername(socket.as_raw_fd(), ptr, &mut len) }, "getpeername"),
	};
	if result == -1 {
		let errno = errno();
		error!(fd = socket.as_raw_fd(), errno, option, "reading socket address failed");
		return Err(SocketError::GetOption { errno, option }.into());
	}

	unsafe { SocketAddrV4::from_sockaddr(ptr, len) }.ok_or_else(|| {
		error!(fd = socket.as_raw_fd(), family = storage.ss_family, option, "socket address is not IPv4");
		SocketError::InvalidAddress { reason: "not an IPv4 address" }.into()
	})
}

impl std::os::fd::AsRawFd for RawSocket {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for RawSocket {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}
