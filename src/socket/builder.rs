use tracing::{debug, error};
use crate::addr::SocketAddrV4;
use crate::error::SocketError;
use super::{RawSocket, PendingConnect, Transport};
use super::options::{set_keepalive, set_keepalive_idle, set_keepalive_interval, set_keepalive_count};

// ============================================================================
// Keep-alive configuration
// ============================================================================

/// Keep-alive timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
	pub idle_secs: u32,
	pub interval_secs: u32,
	pub count: u32,
}

impl Default for KeepaliveConfig {
	fn default() -> Self {
		Self {
			idle_secs: 60,
			interval_secs: 10,
			count: 5,
		}
	}
}

impl KeepaliveConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn idle(mut self, secs: u32) -> Self {
		self.idle_secs = secs;
		self
	}

	pub fn interval(mut self, secs: u32) -> Self {
		self.interval_secs = secs;
		self
	}

	pub fn count(mut self, count: u32) -> Self {
		self.count = count;
		self
	}
}

/// What to do with TCP keep-alive on a new socket. UDP ignores all of it.
///
/// `Disabled` and `SystemDefault` both leave keep-alive without tuning,
/// but they are not the same: `Disabled` switches SO_KEEPALIVE off
/// explicitly, `SystemDefault` never touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepalivePolicy {
	/// No configuration supplied. SO_KEEPALIVE is set to 0.
	#[default]
	Disabled,
	/// Leave whatever the system default is.
	SystemDefault,
	/// SO_KEEPALIVE on, plus idle / interval / count tuning.
	Enabled(KeepaliveConfig),
}

impl KeepalivePolicy {
	/// Maps the flat options record used by the TLS layer.
	///
	/// - `None` → `Disabled`
	/// - `keep_alive < 0` → `SystemDefault`
	/// - otherwise → `Enabled` with the three tuning values, which must
	///   then be non-negative
	pub fn from_options(options: Option<&SocketOptions>) -> std::io::Result<Self> {
		let Some(opts) = options else {
			return Ok(KeepalivePolicy::Disabled);
		};
		if opts.keep_alive < 0 {
			return Ok(KeepalivePolicy::SystemDefault);
		}

		let field = |v: i32, reason: &'static str| -> std::io::Result<u32> {
			u32::try_from(v).map_err(|_| {
				error!(value = v, reason, "bad socket option");
				SocketError::InvalidParameter { reason }.into()
			})
		};
		Ok(KeepalivePolicy::Enabled(KeepaliveConfig {
			idle_secs: field(opts.keep_idle, "negative keep_idle")?,
			interval_secs: field(opts.keep_interval, "negative keep_interval")?,
			count: field(opts.keep_count, "negative keep_count")?,
		}))
	}

	fn apply<S: std::os::fd::AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		match self {
			KeepalivePolicy::Disabled => set_keepalive(socket, false),
			KeepalivePolicy::SystemDefault => Ok(()),
			KeepalivePolicy::Enabled(config) => {
				set_keepalive(socket, true)?;
				set_keepalive_idle(socket, config.idle_secs)?;
				set_keepalive_interval(socket, config.interval_secs)?;
				set_keepalive_count(socket, config.count)
			}
		}
	}
}

/// Flat socket options record as carried by the TLS layer's option set.
///
/// A negative `keep_alive` means "system default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
	pub keep_alive: i32,
	pub keep_idle: i32,
	pub keep_interval: i32,
	pub keep_count: i32,
}

impl Default for SocketOptions {
	fn default() -> Self {
		Self {
			keep_alive: -1,
			keep_idle: 0,
			keep_interval: 0,
			keep_count: 0,
		}
	}
}

// ============================================================================
// Connector Builder
// ============================================================================

/// Builder for non-blocking client sockets.
///
/// # Example
/// ```ignore
/// use socklane::{ConnectorBuilder, KeepaliveConfig, KeepalivePolicy, SocketAddrV4, Transport};
///
/// let pending = ConnectorBuilder::new()
///     .transport(Transport::Tcp)
///     .keepalive(KeepalivePolicy::Enabled(KeepaliveConfig::new().idle(30)))
///     .connect(SocketAddrV4::new([127, 0, 0, 1], 8883))?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorBuilder {
	transport: Transport,
	keepalive: KeepalivePolicy,
}

impl ConnectorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the transport. Default: TCP.
	pub fn transport(mut self, transport: Transport) -> Self {
		self.transport = transport;
		self
	}

	/// Shorthand for `transport(Transport::Udp)`.
	pub fn udp(mut self) -> Self {
		self.transport = Transport::Udp;
		self
	}

	/// Set the keep-alive policy (ignored for UDP). Default: `Disabled`.
	pub fn keepalive(mut self, policy: KeepalivePolicy) -> Self {
		self.keepalive = policy;
		self
	}

	/// Creates, configures, binds and starts connecting.
	///
	/// Returns as soon as the connect is initiated. Failures close the
	/// descriptor before returning.
	pub fn connect(self, addr: SocketAddrV4) -> std::io::Result<PendingConnect> {
		let socket = RawSocket::new(self.transport)?;

		if self.transport.is_udp() {
			debug!(fd = socket.as_raw_fd(), "udp socket, keep-alive policy ignored");
		} else {
			self.keepalive.apply(&socket).inspect_err(|err| {
				error!(policy = ?self.keepalive, error = %err, "setsockopt failed");
			})?;
		}

		socket.set_nonblocking(true).inspect_err(|err| {
			error!(error = %err, "switching to non-blocking failed");
		})?;

		// Wildcard + port 0 reserves an ephemeral local port up front.
		let bound = socket.bind(SocketAddrV4::UNSPECIFIED)?;
		bound.connect_nonblocking(addr)
	}
}
