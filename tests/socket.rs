use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::time::{Duration, Instant};

use socklane::{
	ConnectPoll, ConnectedSocket, ConnectorBuilder, KeepaliveConfig, KeepalivePolicy,
	OptionCaps, PendingConnect, RawSocket, SocketAddrV4, SocketError, SocketOptions, Transport,
	create_socket, get_option_caps, is_nonblocking, keepalive_count, keepalive_enabled,
	keepalive_idle, keepalive_interval, resolve_ipv4, resolve_ipv4_u32, IPV4_NOT_FOUND,
};

const DEADLINE: Duration = Duration::from_secs(5);

fn listener() -> (TcpListener, SocketAddrV4) {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = match listener.local_addr().unwrap() {
		std::net::SocketAddr::V4(v4) => v4.into(),
		other => panic!("unexpected address {other}"),
	};
	(listener, addr)
}

fn wait_connected(pending: PendingConnect) -> ConnectedSocket {
	let start = Instant::now();
	loop {
		match pending.is_create_complete() {
			Ok(true) => return pending.finish(),
			Ok(false) => {}
			Err(err) => panic!("connect failed: {err}"),
		}
		assert!(start.elapsed() < DEADLINE, "connect never completed");
		std::thread::sleep(Duration::from_millis(1));
	}
}

fn tcp_pair() -> (ConnectedSocket, std::net::TcpStream) {
	let (listener, addr) = listener();
	let pending = create_socket(addr, Transport::Tcp, KeepalivePolicy::Disabled).unwrap();
	let client = wait_connected(pending);
	let (server, _) = listener.accept().unwrap();
	(client, server)
}

// ============================================================================
// Resolution and capabilities
// ============================================================================

#[test]
fn localhost_resolves_to_loopback() {
	assert_eq!(resolve_ipv4("localhost"), Some([127, 0, 0, 1]));
	assert_eq!(resolve_ipv4_u32("127.0.0.1").to_ne_bytes(), [127, 0, 0, 1]);
}

#[test]
fn unresolvable_hosts_are_a_miss() {
	for host in ["does-not-exist.invalid", "", "0.0.0.0"] {
		assert_eq!(resolve_ipv4(host), None, "{host}");
		assert_eq!(resolve_ipv4_u32(host), IPV4_NOT_FOUND, "{host}");
	}
}

#[test]
fn no_optional_caps() {
	assert_eq!(get_option_caps(), OptionCaps::NONE);
}

// ============================================================================
// Creation and keep-alive
// ============================================================================

#[test]
fn tcp_without_config_disables_keepalive() {
	let (_listener, addr) = listener();
	let pending = create_socket(addr, Transport::Tcp, KeepalivePolicy::from_options(None).unwrap()).unwrap();
	assert!(!keepalive_enabled(&pending).unwrap());
}

#[test]
fn tcp_with_config_enables_keepalive() {
	let (_listener, addr) = listener();
	let opts = SocketOptions { keep_alive: 1, keep_idle: 20, keep_interval: 7, keep_count: 4 };
	let policy = KeepalivePolicy::from_options(Some(&opts)).unwrap();
	let pending = create_socket(addr, Transport::Tcp, policy).unwrap();

	assert!(keepalive_enabled(&pending).unwrap());
	assert_eq!(keepalive_idle(&pending).unwrap(), 20);
	assert_eq!(keepalive_interval(&pending).unwrap(), 7);
	assert_eq!(keepalive_count(&pending).unwrap(), 4);
}

#[test]
fn tcp_with_negative_marker_keeps_system_default() {
	let (_listener, addr) = listener();
	let fresh = RawSocket::new(Transport::Tcp).unwrap();
	let default_on = keepalive_enabled(&fresh).unwrap();
	let default_idle = keepalive_idle(&fresh).unwrap();

	let opts = SocketOptions { keep_alive: -1, ..SocketOptions::default() };
	let policy = KeepalivePolicy::from_options(Some(&opts)).unwrap();
	assert_eq!(policy, KeepalivePolicy::SystemDefault);
	let pending = create_socket(addr, Transport::Tcp, policy).unwrap();

	assert_eq!(keepalive_enabled(&pending).unwrap(), default_on);
	assert_eq!(keepalive_idle(&pending).unwrap(), default_idle);
}

#[test]
fn bad_keepalive_tuning_fails_creation() {
	let (_listener, addr) = listener();
	let policy = KeepalivePolicy::Enabled(KeepaliveConfig::new().idle(0));
	let err = create_socket(addr, Transport::Tcp, policy).err().expect("idle 0 must be rejected");
	let inner = err.get_ref().and_then(|e| e.downcast_ref::<SocketError>());
	assert!(matches!(inner, Some(SocketError::SetOption { option: "TCP_KEEPIDLE", .. })));
}

#[test]
fn udp_ignores_keepalive_policy() {
	let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
	let addr: SocketAddrV4 = match peer.local_addr().unwrap() {
		std::net::SocketAddr::V4(v4) => v4.into(),
		other => panic!("unexpected address {other}"),
	};

	let policies = [
		KeepalivePolicy::Disabled,
		KeepalivePolicy::SystemDefault,
		KeepalivePolicy::Enabled(KeepaliveConfig::new()),
		// would fail on TCP; UDP never looks at it
		KeepalivePolicy::Enabled(KeepaliveConfig::new().idle(0)),
	];
	for policy in policies {
		let pending = create_socket(addr, Transport::Udp, policy).unwrap();
		assert_eq!(pending.transport(), Transport::Udp);
		assert!(!keepalive_enabled(&pending).unwrap(), "{policy:?}");
	}
}

#[test]
fn created_sockets_are_nonblocking_and_bound() {
	let (_listener, addr) = listener();
	let tcp = create_socket(addr, Transport::Tcp, KeepalivePolicy::Disabled).unwrap();
	assert!(is_nonblocking(&tcp).unwrap());
	assert_ne!(tcp.local_addr().unwrap().port(), 0);
	assert_eq!(tcp.peer_addr(), addr);

	let udp = ConnectorBuilder::new().udp().connect(addr).unwrap();
	assert!(is_nonblocking(&udp).unwrap());
	assert_ne!(udp.local_addr().unwrap().port(), 0);
}

// ============================================================================
// Completion polling
// ============================================================================

#[test]
fn healthy_connect_completes_without_error() {
	let (listener, addr) = listener();
	let pending = create_socket(addr, Transport::Tcp, KeepalivePolicy::Disabled).unwrap();
	let client = wait_connected(pending);
	let (server, _) = listener.accept().unwrap();

	let server_addr: SocketAddrV4 = match server.peer_addr().unwrap() {
		std::net::SocketAddr::V4(v4) => v4.into(),
		other => panic!("unexpected address {other}"),
	};
	assert_eq!(client.local_addr().unwrap(), server_addr);
	assert_eq!(client.peer_addr().unwrap(), addr);
}

#[test]
fn refused_connect_reports_an_error() {
	let (listener, addr) = listener();
	drop(listener);

	let pending = match create_socket(addr, Transport::Tcp, KeepalivePolicy::Disabled) {
		Ok(pending) => pending,
		// Loopback can process the RST before connect() returns.
		Err(err) => {
			assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
			return;
		}
	};

	let start = Instant::now();
	let err = loop {
		match pending.is_create_complete() {
			Ok(complete) => assert!(!complete, "refused connect reported complete"),
			Err(err) => break err,
		}
		assert!(start.elapsed() < DEADLINE, "refusal never reported");
		std::thread::sleep(Duration::from_millis(1));
	};
	assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
	let inner = err.get_ref().and_then(|e| e.downcast_ref::<SocketError>());
	assert!(matches!(inner, Some(SocketError::Connect { .. })));
}

#[test]
fn poll_walks_connecting_to_ready() {
	let (listener, addr) = listener();
	let mut state = ConnectPoll::Pending(
		ConnectorBuilder::new()
			.keepalive(KeepalivePolicy::Enabled(KeepaliveConfig::new().idle(30).interval(5).count(3)))
			.connect(addr)
			.unwrap(),
	);

	let start = Instant::now();
	let client = loop {
		state = match state {
			ConnectPoll::Pending(pending) => pending.poll().unwrap(),
			ConnectPoll::Ready(socket) => break socket,
		};
		assert!(start.elapsed() < DEADLINE);
	};
	let _server = listener.accept().unwrap();

	assert_eq!(client.transport(), Transport::Tcp);
	assert!(keepalive_enabled(&client).unwrap());
	assert_eq!(keepalive_idle(&client).unwrap(), 30);
}

#[test]
fn udp_connect_is_complete_immediately() {
	let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
	let addr: SocketAddrV4 = match peer.local_addr().unwrap() {
		std::net::SocketAddr::V4(v4) => v4.into(),
		other => panic!("unexpected address {other}"),
	};
	let pending = create_socket(addr, Transport::Udp, KeepalivePolicy::Disabled).unwrap();
	assert!(pending.is_create_complete().unwrap());
	assert!(pending.poll().unwrap().is_ready());
}

// ============================================================================
// Data transfer
// ============================================================================

#[test]
fn empty_send_is_a_noop() {
	let (client, server) = tcp_pair();
	assert_eq!(client.send(&[]).unwrap(), 0);
	drop(server);
	// still a no-op once the peer is gone
	assert_eq!(client.send(&[]).unwrap(), 0);
}

#[test]
fn empty_receive_is_a_parameter_error() {
	let (client, _server) = tcp_pair();
	let err = client.receive(&mut []).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidInput);
	let inner = err.get_ref().and_then(|e| e.downcast_ref::<SocketError>());
	assert!(matches!(inner, Some(SocketError::InvalidParameter { .. })));
}

#[test]
fn receive_with_nothing_pending_would_block() {
	let (client, _server) = tcp_pair();
	let mut buf = [0u8; 64];
	let start = Instant::now();
	assert_eq!(client.receive(&mut buf).unwrap(), 0);
	assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn full_send_buffer_would_block() {
	let (client, _server) = tcp_pair();
	let chunk = vec![0xA5u8; 64 * 1024];
	let mut total = 0usize;
	let mut blocked = false;
	for _ in 0..100_000 {
		let n = client.send(&chunk).unwrap();
		if n == 0 {
			blocked = true;
			break;
		}
		total += n;
	}
	assert!(blocked, "send never reported would-block after {total} bytes");
	assert!(total > 0);
}

#[test]
fn tcp_round_trip_preserves_bytes() {
	let (client, mut server) = tcp_pair();
	server.set_nonblocking(true).unwrap();

	let outbound: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
	let mut sent = 0;
	let mut echoed = Vec::with_capacity(outbound.len());
	let mut buf = [0u8; 8192];

	let start = Instant::now();
	while echoed.len() < outbound.len() {
		if sent < outbound.len() {
			sent += client.send(&outbound[sent..]).unwrap();
		}
		match server.read(&mut buf) {
			Ok(0) => panic!("client closed early"),
			Ok(n) => {
				// echo back through a blocking write; loopback buffers absorb it
				server.set_nonblocking(false).unwrap();
				server.write_all(&buf[..n]).unwrap();
				server.set_nonblocking(true).unwrap();
			}
			Err(err) if err.kind() == ErrorKind::WouldBlock => {}
			Err(err) => panic!("server read failed: {err}"),
		}
		loop {
			let n = client.receive(&mut buf).unwrap();
			if n == 0 {
				break;
			}
			echoed.extend_from_slice(&buf[..n]);
		}
		assert!(start.elapsed() < DEADLINE * 4, "round trip stalled");
	}
	assert_eq!(echoed, outbound);
}

#[test]
fn udp_round_trip() {
	let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
	peer.set_read_timeout(Some(DEADLINE)).unwrap();
	let addr: SocketAddrV4 = match peer.local_addr().unwrap() {
		std::net::SocketAddr::V4(v4) => v4.into(),
		other => panic!("unexpected address {other}"),
	};

	let client = wait_connected(create_socket(addr, Transport::Udp, KeepalivePolicy::Disabled).unwrap());
	assert_eq!(client.send(b"ping").unwrap(), 4);

	let mut buf = [0u8; 16];
	let (n, from) = peer.recv_from(&mut buf).unwrap();
	assert_eq!(&buf[..n], b"ping");
	assert_eq!(from.port(), client.local_addr().unwrap().port());

	peer.send_to(b"pong", from).unwrap();
	let start = Instant::now();
	let n = loop {
		let n = client.receive(&mut buf).unwrap();
		if n > 0 {
			break n;
		}
		assert!(start.elapsed() < DEADLINE);
		std::thread::sleep(Duration::from_millis(1));
	};
	assert_eq!(&buf[..n], b"pong");
}

#[test]
fn send_to_reset_peer_is_a_hard_error() {
	let (client, server) = tcp_pair();
	assert_eq!(client.send(b"unread").unwrap(), 6);
	std::thread::sleep(Duration::from_millis(20));
	// closing with unread data makes the kernel answer with RST
	drop(server);

	let start = Instant::now();
	let err = loop {
		match client.send(b"more") {
			Ok(_) => {}
			Err(err) => break err,
		}
		assert!(start.elapsed() < DEADLINE, "send never failed after reset");
		std::thread::sleep(Duration::from_millis(5));
	};
	assert!(
		matches!(err.kind(), ErrorKind::ConnectionReset | ErrorKind::BrokenPipe),
		"{err:?}"
	);
}
