use std::os::fd::AsRawFd;
use tracing::error;
use crate::error::{SocketError, errno};

fn setsockopt_int<S: AsRawFd>(
	socket: &S,
	level: libc::c_int,
	name: libc::c_int,
	val: libc::c_int,
	option: &'static str,
) -> std::io::Result<()> {
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			level,
			name,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option }.into())
	} else {
		Ok(())
	}
}

/// Keep-alive tuning values must fit the kernel's `int`.
fn tuning_value(value: u32, option: &'static str) -> std::io::Result<libc::c_int> {
	libc::c_int::try_from(value).map_err(|_| {
		error!(value, option, "keep-alive value out of range");
		SocketError::InvalidParameter { reason: "keep-alive value exceeds i32::MAX" }.into()
	})
}

fn getsockopt_int<S: AsRawFd>(
	socket: &S,
	level: libc::c_int,
	name: libc::c_int,
	option: &'static str,
) -> std::io::Result<libc::c_int> {
	let mut val: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
	let result = unsafe {
		libc::getsockopt(
			socket.as_raw_fd(),
			level,
			name,
			&mut val as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};
	if result == -1 {
		Err(SocketError::GetOption { errno: errno(), option }.into())
	} else {
		Ok(val)
	}
}

/// Enables or disables TCP keep-alive (SO_KEEPALIVE).
///
/// When enabled, the kernel sends probes on idle connections to detect dead peers.
/// Use with TCP_KEEPIDLE, TCP_KEEPINTVL, TCP_KEEPCNT to tune timing.
pub fn set_keepalive<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	setsockopt_int(socket, libc::SOL_SOCKET, libc::SO_KEEPALIVE, enable as libc::c_int, "SO_KEEPALIVE")
}

/// Sets TCP keep-alive idle time (TCP_KEEPIDLE).
///
/// Seconds of idle time before the first keep-alive probe is sent.
/// Requires SO_KEEPALIVE to be enabled.
pub fn set_keepalive_idle<S: AsRawFd>(socket: &S, seconds: u32) -> std::io::Result<()> {
	let val = tuning_value(seconds, "TCP_KEEPIDLE")?;
	setsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, val, "TCP_KEEPIDLE")
}

/// Sets TCP keep-alive probe interval (TCP_KEEPINTVL).
///
/// Seconds between successive keep-alive probes if no response.
pub fn set_keepalive_interval<S: AsRawFd>(socket: &S, seconds: u32) -> std::io::Result<()> {
	let val = tuning_value(seconds, "TCP_KEEPINTVL")?;
	setsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, val, "TCP_KEEPINTVL")
}

/// Sets TCP keep-alive probe count (TCP_KEEPCNT).
///
/// Number of unacknowledged probes before connection is considered dead.
/// Total detection time = KEEPIDLE + (KEEPINTVL × KEEPCNT).
pub fn set_keepalive_count<S: AsRawFd>(socket: &S, count: u32) -> std::io::Result<()> {
	let val = tuning_value(count, "TCP_KEEPCNT")?;
	setsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPCNT, val, "TCP_KEEPCNT")
}

/// Reads SO_KEEPALIVE.
pub fn keepalive_enabled<S: AsRawFd>(socket: &S) -> std::io::Result<bool> {
	getsockopt_int(socket, libc::SOL_SOCKET, libc::SO_KEEPALIVE, "SO_KEEPALIVE").map(|v| v != 0)
}

/// Reads TCP_KEEPIDLE in seconds.
pub fn keepalive_idle<S: AsRawFd>(socket: &S) -> std::io::Result<u32> {
	getsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, "TCP_KEEPIDLE").map(|v| v as u32)
}

/// Reads TCP_KEEPINTVL in seconds.
pub fn keepalive_interval<S: AsRawFd>(socket: &S) -> std::io::Result<u32> {
	getsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, "TCP_KEEPINTVL").map(|v| v as u32)
}

/// Reads TCP_KEEPCNT.
pub fn keepalive_count<S: AsRawFd>(socket: &S) -> std::io::Result<u32> {
	getsockopt_int(socket, libc::IPPROTO_TCP, libc::TCP_KEEPCNT, "TCP_KEEPCNT").map(|v| v as u32)
}

/// Sets or clears O_NONBLOCK.
pub fn set_nonblocking<S: AsRawFd>(socket: &S, nonblocking: bool) -> std::io::Result<()> {
	let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
	if flags == -1 {
		return Err(SocketError::GetOption { errno: errno(), option: "F_GETFL" }.into());
	}

	let new_flags = if nonblocking {
		flags | libc::O_NONBLOCK
	} else {
		flags & !libc::O_NONBLOCK
	};

	let result = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_SETFL, new_flags) };
	if result == -1 {
		return Err(SocketError::SetOption { errno: errno(), option: "O_NONBLOCK" }.into());
	}
	Ok(())
}

/// Returns true if O_NONBLOCK is set.
pub fn is_nonblocking<S: AsRawFd>(socket: &S) -> std::io::Result<bool> {
	let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
	if flags == -1 {
		return Err(SocketError::GetOption { errno: errno(), option: "F_GETFL" }.into());
	}
	Ok(flags & libc::O_NONBLOCK != 0)
}

/// Reads and clears the pending socket error (SO_ERROR).
///
/// Returns 0 when no error is pending. Reading clears it.
pub fn take_socket_error<S: AsRawFd>(socket: &S) -> std::io::Result<i32> {
	getsockopt_int(socket, libc::SOL_SOCKET, libc::SO_ERROR, "SO_ERROR")
}
