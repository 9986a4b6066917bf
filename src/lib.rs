//! Non-blocking IPv4 TCP/UDP client sockets for constrained targets.
//!
//! Resolve a host, create a socket (returns immediately with the connect in
//! flight), poll until it completes, then move bytes with partial,
//! never-blocking send/receive. Nothing here spawns threads or waits.

pub mod socket;
mod addr;
mod error;

pub use self::error::{IoError, SocketError, errno};
pub use self::addr::{SocketAddrV4, resolve_ipv4, resolve_ipv4_u32, IPV4_NOT_FOUND};
pub use self::socket::{Transport, OptionCaps, get_option_caps, create_socket,
					   ConnectorBuilder, KeepaliveConfig, KeepalivePolicy, SocketOptions,
					   RawSocket, BoundSocket, PendingConnect, ConnectPoll, ConnectedSocket};
pub use self::socket::options::{set_keepalive, set_keepalive_idle, set_keepalive_interval,
								set_keepalive_count, keepalive_enabled, keepalive_idle,
								keepalive_interval, keepalive_count, set_nonblocking,
								is_nonblocking, take_socket_error};
