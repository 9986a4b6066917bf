use std::ffi::{CStr, CString};
use tracing::{debug, info};

/// Network-order value meaning "no IPv4 address found".
///
/// `0.0.0.0` is not a routable unicast address, so it can never be a
/// legitimate lookup result.
pub const IPV4_NOT_FOUND: u32 = 0;

/// Resolves `hostname` to its first IPv4 address.
///
/// Synchronous `getaddrinfo()` restricted to `AF_INET` / TCP records.
/// A failed lookup is not an error: losing connectivity is an ordinary
/// condition for the callers of this crate, so misses are logged at info
/// level and reported as `None`.
pub fn resolve_ipv4(hostname: &str) -> Option<[u8; 4]> {
	let Ok(host) = CString::new(hostname) else {
		info!(hostname, "hostname contains a NUL byte");
		return None;
	};

	let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
	hints.ai_family = libc::AF_INET;
	hints.ai_socktype = libc::SOCK_STREAM;
	hints.ai_protocol = libc::IPPROTO_TCP;

	let mut list: *mut libc::addrinfo = std::ptr::null_mut();
	let rc = unsafe { libc::getaddrinfo(host.as_ptr(), std::ptr::null(), &hints, &mut list) };
	if rc != 0 {
		let reason = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) };
		info!(hostname, code = rc, reason = %reason.to_string_lossy(), "getaddrinfo failed");
		return None;
	}

	let found = first_ipv4(list);
	unsafe { libc::freeaddrinfo(list) };

	match found {
		Some(ip) => {
			debug!(hostname, ip = ?ip, "resolved");
			Some(ip)
		}
		None => {
			info!(hostname, "no IPv4 DNS entry");
			None
		}
	}
}

/// Same as [`resolve_ipv4`] but in the network-byte-order `u32` form,
/// with [`IPV4_NOT_FOUND`] standing for a miss.
pub fn resolve_ipv4_u32(hostname: &str) -> u32 {
	resolve_ipv4(hostname).map_or(IPV4_NOT_FOUND, u32::from_ne_bytes)
}

/// Walks the `getaddrinfo` list and returns the first non-zero IPv4 entry.
fn first_ipv4(list: *const libc::addrinfo) -> Option<[u8; 4]> {
	let mut node = list;
	while !node.is_null() {
		let entry = unsafe { &*node };
		if entry.ai_family == libc::AF_INET
			&& !entry.ai_addr.is_null()
			&& entry.ai_addrlen as usize >= std::mem::size_of::<libc::sockaddr_in>()
		{
			let sin = unsafe { &*(entry.ai_addr as *const libc::sockaddr_in) };
			if sin.sin_addr.s_addr != IPV4_NOT_FOUND {
				return Some(sin.sin_addr.s_addr.to_ne_bytes());
			}
		}
		node = entry.ai_next;
	}
	None
}
