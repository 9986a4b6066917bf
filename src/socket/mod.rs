mod raw;
mod bound;
mod builder;
mod pending;
mod connected;
pub mod options;

pub use self::raw::RawSocket;
pub use self::bound::BoundSocket;
pub use self::builder::{ConnectorBuilder, KeepaliveConfig, KeepalivePolicy, SocketOptions};
pub use self::pending::{PendingConnect, ConnectPoll};
pub use self::connected::ConnectedSocket;

use crate::addr::SocketAddrV4;

/// Transport carried by a socket.
///
/// - `Tcp` — reliable, ordered byte stream (`SOCK_STREAM`)
/// - `Udp` — unreliable datagrams (`SOCK_DGRAM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
	#[default]
	Tcp,
	Udp,
}

impl Transport {
	/// Returns the libc socket type constant.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Transport::Tcp => libc::SOCK_STREAM,
			Transport::Udp => libc::SOCK_DGRAM,
		}
	}

	#[inline]
	pub fn is_udp(self) -> bool {
		self == Transport::Udp
	}

	/// Maps the `is_udp` flag used by the TLS layer.
	#[inline]
	pub fn from_is_udp(is_udp: bool) -> Self {
		if is_udp { Transport::Udp } else { Transport::Tcp }
	}
}

/// Bitmask of optional TLS-related socket options an implementation supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OptionCaps(u32);

impl OptionCaps {
	pub const NONE: Self = Self(0);

	#[inline]
	pub fn bits(self) -> u32 {
		self.0
	}

	#[inline]
	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	#[inline]
	pub fn is_empty(self) -> bool {
		self.0 == 0
	}
}

/// Reports which optional socket options this implementation supports.
///
/// There are no per-platform options here, so this is always `NONE`.
pub fn get_option_caps() -> OptionCaps {
	OptionCaps::NONE
}

/// Creates a non-blocking socket and starts connecting it to `addr`.
///
/// Shorthand for [`ConnectorBuilder`]. The returned handle is still
/// connecting; poll it with [`PendingConnect::is_create_complete`] or
/// [`PendingConnect::poll`].
pub fn create_socket(
	addr: SocketAddrV4,
	transport: Transport,
	keepalive: KeepalivePolicy,
) -> std::io::Result<PendingConnect> {
	ConnectorBuilder::new()
		.transport(transport)
		.keepalive(keepalive)
		.connect(addr)
}
