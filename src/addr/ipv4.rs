use std::fmt;
use crate::addr::ToSockAddr;

/// IPv4 socket address (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	/// Wildcard address with an ephemeral port (`0.0.0.0:0`).
	pub const UNSPECIFIED: Self = Self { ip: [0, 0, 0, 0], port: 0 };

	/// Creates a new IPv4 address.
	pub const fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Creates from an IP tuple and port.
	/// Example: `SocketAddrV4::from((192, 168, 1, 1), 8080)`
	pub fn from(ip: (u8, u8, u8, u8), port: u16) -> Self {
		Self {
			ip: [ip.0, ip.1, ip.2, ip.3],
			port,
		}
	}

	/// Creates from an address already in network byte order, the form
	/// `resolve_ipv4_u32` hands out and `s_addr` stores.
	pub fn from_network_u32(addr: u32, port: u16) -> Self {
		Self {
			ip: addr.to_ne_bytes(),
			port,
		}
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 4] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Returns the IP in network byte order, as stored in `s_addr`.
	pub fn to_network_u32(&self) -> u32 {
		u32::from_ne_bytes(self.ip)
	}

	/// Converts to the raw sockaddr_in for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		libc::sockaddr_in {
			sin_family: libc::AF_INET as libc::sa_family_t,
			sin_port: self.port.to_be(),
			sin_addr: libc::in_addr {
				s_addr: self.to_network_u32(),
			},
			sin_zero: [0; 8],
		}
	}
}

impl fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [a, b, c, d] = self.ip;
		write!(f, "{a}.{b}.{c}.{d}:{}", self.port)
	}
}

impl From<std::net::SocketAddrV4> for SocketAddrV4 {
	fn from(addr: std::net::SocketAddrV4) -> Self {
		Self::new(addr.ip().octets(), addr.port())
	}
}

impl ToSockAddr for SocketAddrV4 {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw();  // sockaddr_in lives on THIS stack frame
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
		f(ptr, len)
	}
}
