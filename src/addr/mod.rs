//! IPv4 addressing and hostname resolution.
//!
//! Sockets created by this crate are always `AF_INET`. Addresses travel
//! to the kernel through the closure-based [`ToSockAddr`] conversion so the
//! `sockaddr_in` only ever lives on the caller's stack frame.

mod ipv4;
mod resolve;
pub use self::ipv4::SocketAddrV4;
pub use self::resolve::{resolve_ipv4, resolve_ipv4_u32, IPV4_NOT_FOUND};

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

impl FromSockAddr for SocketAddrV4 {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t {
			return None;
		}
		let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
		if raw.sin_family != libc::AF_INET as libc::sa_family_t {
			return None;
		}
		Some(Self::from_raw(raw))
	}
}
