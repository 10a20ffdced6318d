//! Loopback end-to-end tests
//!
//! Each test runs a director on 127.0.0.1 in a background thread and talks to
//! it over real sockets, then stops it through the shared flag.
//!
//! Usage:
//!   cargo test --test loopback_echo

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pdubridge::network::{DatagramDirector, StreamDirector, StreamOptions, HELLO};
use pdubridge::{BridgeError, Echo, Indication, Pdu, Response};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Running {
    fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().unwrap();
    }
}

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

fn spawn_stream<U, F>(options: StreamOptions, factory: F) -> Running
where
    U: Response + 'static,
    F: FnMut(SocketAddr) -> U + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let mut director = StreamDirector::bind(loopback(), options, factory).unwrap();
        tx.send(director.local_addr().unwrap()).unwrap();
        director.run_until(&flag).unwrap();
    });

    Running {
        addr: rx.recv().unwrap(),
        stop,
        handle,
    }
}

fn spawn_datagram() -> Running {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let mut director = DatagramDirector::bind(loopback(), Echo).unwrap();
        tx.send(director.local_addr().unwrap()).unwrap();
        director.run_until(&flag).unwrap();
    });

    Running {
        addr: rx.recv().unwrap(),
        stop,
        handle,
    }
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    stream
}

#[test]
fn tcp_echo_returns_payload() {
    let server = spawn_stream(StreamOptions::default(), |_: SocketAddr| Echo);
    let mut client = connect(server.addr);

    client.write_all(&[0x01, 0x02]).unwrap();
    let mut buf = [0u8; 2];
    client.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [0x01, 0x02]);

    drop(client);
    server.shutdown();
}

#[test]
fn tcp_clients_are_independent() {
    let server = spawn_stream(StreamOptions::default(), |_: SocketAddr| Echo);
    let mut a = connect(server.addr);
    let mut b = connect(server.addr);

    a.write_all(b"from a").unwrap();
    b.write_all(b"from b").unwrap();

    let mut buf = [0u8; 6];
    b.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"from b");
    a.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"from a");

    server.shutdown();
}

#[test]
fn tcp_hello_sent_on_connect() {
    let options = StreamOptions {
        hello: true,
        ..Default::default()
    };
    let server = spawn_stream(options, |_: SocketAddr| Echo);
    let mut client = connect(server.addr);

    let mut buf = vec![0u8; HELLO.len()];
    client.read_exact(&mut buf).unwrap();
    assert_eq!(buf, HELLO);

    server.shutdown();
}

#[test]
fn tcp_idle_connection_closed() {
    let options = StreamOptions {
        idle_timeout: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let server = spawn_stream(options, |_: SocketAddr| Echo);
    let mut client = connect(server.addr);

    // EOF once the director drops the idle actor
    let mut buf = [0u8; 1];
    assert_eq!(client.read(&mut buf).unwrap(), 0);

    server.shutdown();
}

#[test]
fn tcp_factory_builds_one_upper_layer_per_peer() {
    /// Replies with how many chunks this connection has delivered
    struct Counter(u32);

    impl Response for Counter {
        fn response(&mut self, _pdu: Pdu, downstream: &mut dyn Indication) -> pdubridge::Result<()> {
            self.0 += 1;
            downstream.indication(Pdu::new(self.0.to_string().into_bytes()))
        }
    }

    let server = spawn_stream(StreamOptions::default(), |_: SocketAddr| Counter(0));
    let mut a = connect(server.addr);
    let mut b = connect(server.addr);
    let mut buf = [0u8; 1];

    for expected in [b"1", b"2", b"3"] {
        a.write_all(b"x").unwrap();
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, expected);
    }

    b.write_all(b"x").unwrap();
    b.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"1");

    server.shutdown();
}

#[test]
fn udp_echo_returns_to_sender() {
    let server = spawn_datagram();
    let client = UdpSocket::bind(loopback()).unwrap();
    client.set_read_timeout(Some(IO_TIMEOUT)).unwrap();

    client.send_to(&[0xFF], server.addr).unwrap();

    let mut buf = [0u8; 16];
    let (n, from) = client.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], &[0xFF]);
    assert_eq!(from, server.addr);

    server.shutdown();
}

#[test]
fn udp_empty_datagram_echoed() {
    let server = spawn_datagram();
    let client = UdpSocket::bind(loopback()).unwrap();
    client.set_read_timeout(Some(IO_TIMEOUT)).unwrap();

    client.send_to(&[], server.addr).unwrap();

    let mut buf = [0u8; 16];
    let (n, from) = client.recv_from(&mut buf).unwrap();
    assert_eq!(n, 0);
    assert_eq!(from, server.addr);

    server.shutdown();
}

#[test]
fn tcp_half_close_still_returns_every_byte() {
    let server = spawn_stream(StreamOptions::default(), |_: SocketAddr| Echo);
    let mut client = connect(server.addr);

    // Large enough that part of the echo is parked server-side
    let payload: Vec<u8> = (0..900 * 1024).map(|i| (i % 251) as u8).collect();
    let mut writer = client.try_clone().unwrap();
    let data = payload.clone();
    let sender = thread::spawn(move || {
        writer.write_all(&data).unwrap();
        writer.shutdown(Shutdown::Write).unwrap();
    });

    thread::sleep(Duration::from_millis(500));
    let mut echoed = Vec::new();
    client.read_to_end(&mut echoed).unwrap();
    sender.join().unwrap();

    assert_eq!(echoed.len(), payload.len());
    assert!(echoed == payload);

    server.shutdown();
}

#[test]
fn tcp_failing_actor_does_not_affect_others() {
    /// Refuses everything when `refuse` is set, echoes otherwise
    struct Gate {
        refuse: bool,
    }

    impl Response for Gate {
        fn response(&mut self, pdu: Pdu, downstream: &mut dyn Indication) -> pdubridge::Result<()> {
            if self.refuse {
                return Err(BridgeError::Config("refused".into()));
            }
            downstream.indication(pdu)
        }
    }

    let mut accepted = 0;
    let server = spawn_stream(StreamOptions::default(), move |_: SocketAddr| {
        accepted += 1;
        Gate {
            refuse: accepted == 1,
        }
    });

    let mut failing = connect(server.addr);
    failing.write_all(b"x").unwrap();
    let mut buf = [0u8; 1];
    match failing.read(&mut buf) {
        Ok(0) => {}
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {}
        other => panic!("expected the failing actor to be closed, got {:?}", other),
    }

    let mut healthy = connect(server.addr);
    healthy.write_all(b"ok").unwrap();
    let mut buf = [0u8; 2];
    healthy.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ok");

    server.shutdown();
}

#[test]
fn tcp_active_connection_outlives_idle_timeout() {
    let options = StreamOptions {
        idle_timeout: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let server = spawn_stream(options, |_: SocketAddr| Echo);
    let mut client = connect(server.addr);
    let mut buf = [0u8; 1];

    // About 1s in total, several times the timeout
    for _ in 0..10 {
        client.write_all(b"k").unwrap();
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"k");
        thread::sleep(Duration::from_millis(100));
    }

    server.shutdown();
}

#[test]
fn tcp_actor_count_follows_connections() {
    let mut director =
        StreamDirector::bind(loopback(), StreamOptions::default(), |_: SocketAddr| Echo).unwrap();
    let client = TcpStream::connect(director.local_addr().unwrap()).unwrap();

    let deadline = Instant::now() + IO_TIMEOUT;
    while director.actor_count() != 1 && Instant::now() < deadline {
        director.poll_once(Some(Duration::from_millis(50))).unwrap();
    }
    assert_eq!(director.actor_count(), 1);

    drop(client);
    let deadline = Instant::now() + IO_TIMEOUT;
    while director.actor_count() != 0 && Instant::now() < deadline {
        director.poll_once(Some(Duration::from_millis(50))).unwrap();
    }
    assert_eq!(director.actor_count(), 0);
}

#[test]
fn udp_keeps_serving_after_peer_vanishes() {
    let server = spawn_datagram();

    // Echo to this one lands on a closed port
    let gone = UdpSocket::bind(loopback()).unwrap();
    gone.send_to(b"bye", server.addr).unwrap();
    drop(gone);
    thread::sleep(Duration::from_millis(200));

    let client = UdpSocket::bind(loopback()).unwrap();
    client.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    client.send_to(b"still there", server.addr).unwrap();

    let mut buf = [0u8; 32];
    let (n, from) = client.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"still there");
    assert_eq!(from, server.addr);

    server.shutdown();
}
