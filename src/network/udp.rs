//! Datagram director: satu UDP socket, satu upper layer
//!
//! Every datagram read from the socket goes up through
//! `DatagramBridge::upward` with the sender's host and port. Downward
//! datagrams go out through `UdpTransport`, which parks them when the
//! socket's send buffer is full and retries on the next writable event.

use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::bridge::{Confirmation, DatagramBridge, DatagramTransport};
use crate::error::Result;

const SOCKET_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 64;
const MAX_DATAGRAM: usize = 65_535;
const MAX_PENDING_DATAGRAMS: usize = 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Non-blocking UDP socket used as the bridge's `DatagramTransport`
pub struct UdpTransport {
    socket: UdpSocket,
    pending: VecDeque<(SocketAddr, Bytes)>,
}

impl UdpTransport {
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr)?,
            pending: VecDeque::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive satu datagram. `Ok(None)` kalau socket kosong.
    pub fn receive(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        loop {
            match self.socket.recv_from(buf) {
                Ok(received) => return Ok(Some(received)),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Retry parked datagrams in order
    pub fn flush_pending(&mut self) -> io::Result<()> {
        while let Some((target, data)) = self.pending.front() {
            match self.socket.send_to(data, *target) {
                Ok(_) => {
                    self.pending.pop_front();
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // One bad destination must not block the rest of the queue
                    warn!(%target, error = %e, "dropping parked datagram");
                    self.pending.pop_front();
                }
            }
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn park(&mut self, target: SocketAddr, data: &[u8]) -> io::Result<()> {
        if self.pending.len() >= MAX_PENDING_DATAGRAMS {
            return Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "send queue full",
            ));
        }
        self.pending.push_back((target, Bytes::copy_from_slice(data)));
        Ok(())
    }
}

impl DatagramTransport for UdpTransport {
    fn send_to(&mut self, data: &[u8], host: &str, port: u16) -> io::Result<()> {
        let target = resolve(host, port)?;

        self.flush_pending()?;
        if !self.pending.is_empty() {
            return self.park(target, data);
        }

        loop {
            match self.socket.send_to(data, target) {
                Ok(n) if n == data.len() => return Ok(()),
                Ok(n) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: {} of {} bytes", n, data.len()),
                    ))
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return self.park(target, data)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Resolve `(host, port)`; IP literals skip the resolver.
fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address for {}:{}", host, port),
        )
    })
}

/// UDP server that hands every datagram to one upper layer.
pub struct DatagramDirector<U> {
    poll: Poll,
    events: Events,
    bridge: DatagramBridge<UdpTransport>,
    upper: U,
    read_buffer: Box<[u8]>,
}

impl<U: Confirmation> DatagramDirector<U> {
    pub fn bind(addr: SocketAddr, upper: U) -> Result<Self> {
        let poll = Poll::new()?;
        let mut transport = UdpTransport::bind(addr)?;

        poll.registry().register(
            &mut transport.socket,
            SOCKET_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;

        info!(addr = %transport.local_addr()?, "datagram director listening");

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            bridge: DatagramBridge::new(transport),
            upper,
            read_buffer: vec![0u8; MAX_DATAGRAM].into_boxed_slice(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.bridge.transport().local_addr()?)
    }

    pub fn upper(&self) -> &U {
        &self.upper
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll_once(Some(POLL_INTERVAL))?;
        }
    }

    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            self.poll_once(Some(POLL_INTERVAL))?;
        }
        info!("datagram director stopped");
        Ok(())
    }

    pub fn poll_once(&mut self, timeout: Option<Duration>) -> Result<()> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let (mut readable, mut writable) = (false, false);
        for event in self.events.iter() {
            readable |= event.is_readable();
            writable |= event.is_writable();
        }

        if writable {
            self.bridge.transport_mut().flush_pending()?;
        }
        if readable {
            self.drain_socket();
        }
        Ok(())
    }

    fn drain_socket(&mut self) {
        loop {
            let (n, source) = match self.bridge.transport().receive(&mut self.read_buffer) {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(e) => {
                    // e.g. ICMP port unreachable reported on the next recv
                    warn!(error = %e, "receive failed, datagram dropped");
                    break;
                }
            };

            let host = source.ip().to_string();
            let result =
                self.bridge
                    .upward(&self.read_buffer[..n], &host, source.port(), &mut self.upper);

            // Satu datagram gagal tidak menghentikan server
            if let Err(e) = result {
                warn!(%source, len = n, error = %e, "datagram dropped");
            }
        }
        debug!(pending = self.bridge.transport().pending(), "socket drained");
    }
}
