//! Stream director: TCP listener dengan satu actor per koneksi
//!
//! Menggunakan mio untuk non-blocking I/O multiplexing. Each accepted
//! connection becomes an actor: a `StreamBridge` over the `Connection`
//! plus the upper layer the factory built for that peer. Every chunk read
//! from the socket goes up through `StreamBridge::upward`; whatever the
//! upper layer sends back goes down the same connection.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Registry, Token};
use tracing::{debug, info, warn};

use super::Connection;
use crate::bridge::{Indication, Response, StreamBridge};
use crate::error::Result;
use crate::protocol::Pdu;

const SERVER_TOKEN: Token = Token(0);
const MAX_CONNECTIONS: usize = 1024;
const EVENTS_CAPACITY: usize = 1024;
const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Greeting sent to new actors when `hello` is enabled
pub const HELLO: &[u8] = b"Hello, world!\n";

/// Stream director settings
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Close connections that have not received anything for this long
    pub idle_timeout: Option<Duration>,
    /// Send `HELLO` to every client as soon as it connects
    pub hello: bool,
}

struct Actor<U> {
    bridge: StreamBridge<Connection>,
    upper: U,
    last_activity: Instant,
    // Peer sent EOF; stay alive only to flush parked writes
    read_closed: bool,
}

/// TCP server that binds each connection to its own upper layer.
pub struct StreamDirector<U, F> {
    poll: Poll,
    listener: TcpListener,
    events: Events,
    actors: HashMap<Token, Actor<U>>,
    next_token: usize,
    factory: F,
    options: StreamOptions,
    // Shared read buffer, hanya dipakai selama satu read
    read_buffer: Box<[u8]>,
}

impl<U, F> StreamDirector<U, F>
where
    U: Response,
    F: FnMut(SocketAddr) -> U,
{
    /// Membuat director baru
    pub fn bind(addr: SocketAddr, options: StreamOptions, factory: F) -> Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;

        poll.registry()
            .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;

        info!(addr = %listener.local_addr()?, ?options, "stream director listening");

        Ok(Self {
            poll,
            listener,
            events: Events::with_capacity(EVENTS_CAPACITY),
            actors: HashMap::with_capacity(64),
            next_token: 1,
            factory,
            options,
            read_buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of live connections
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Run event loop selamanya
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll_once(Some(POLL_INTERVAL))?;
        }
    }

    /// Run event loop sampai `stop` di-set
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            self.poll_once(Some(POLL_INTERVAL))?;
        }
        info!("stream director stopped");
        Ok(())
    }

    /// Wait for events once, service them, then sweep idle actors.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> Result<()> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // Copy readiness out so handlers can borrow self mutably
        let ready: Vec<(Token, bool, bool)> = self
            .events
            .iter()
            .map(|e| {
                (
                    e.token(),
                    e.is_readable() || e.is_read_closed() || e.is_error(),
                    e.is_writable(),
                )
            })
            .collect();

        for (token, readable, writable) in ready {
            if token == SERVER_TOKEN {
                self.accept_connections()?;
                continue;
            }
            if writable {
                self.handle_write(token);
            }
            if readable {
                self.handle_read(token);
            }
        }

        self.sweep_idle();
        Ok(())
    }

    /// Accept new connections
    fn accept_connections(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if self.actors.len() >= MAX_CONNECTIONS {
                        warn!(%peer, "max connections reached, rejecting");
                        continue;
                    }
                    if let Err(e) = self.add_actor(stream, peer) {
                        warn!(%peer, error = %e, "failed to set up actor");
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn add_actor(&mut self, stream: mio::net::TcpStream, peer: SocketAddr) -> Result<()> {
        let token = Token(self.next_token);
        self.next_token += 1;

        let mut conn = Connection::new(stream, peer)?;
        conn.register(self.poll.registry(), token)?;

        let mut actor = Actor {
            bridge: StreamBridge::new(conn),
            upper: (self.factory)(peer),
            last_activity: Instant::now(),
            read_closed: false,
        };
        info!(%peer, token = token.0, "add_actor");

        if self.options.hello {
            if let Err(e) = actor.bridge.indication(Pdu::new(HELLO)) {
                warn!(%peer, error = %e, "actor_error");
                retire(self.poll.registry(), token, actor.bridge.transport_mut(), "error");
                return Ok(());
            }
        }

        self.actors.insert(token, actor);
        Ok(())
    }

    /// Handle readable event: drain the socket, one upward call per chunk
    fn handle_read(&mut self, token: Token) {
        let Some(actor) = self.actors.get_mut(&token) else {
            return;
        };
        if actor.read_closed {
            return;
        }

        let outcome = loop {
            match actor.bridge.transport_mut().receive(&mut self.read_buffer) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    actor.last_activity = Instant::now();
                    if let Err(e) = actor
                        .bridge
                        .upward(&self.read_buffer[..n], &mut actor.upper)
                    {
                        break Err(e.to_string());
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    let pending = actor.bridge.transport().write_pending();
                    if pending == 0 {
                        self.close(token, "closed by peer");
                    } else {
                        // Half-close: the peer may still be reading
                        debug!(token = token.0, pending, "peer closed, draining writes");
                        actor.read_closed = true;
                    }
                    return;
                }
                Err(e) => break Err(e.to_string()),
            }
        };

        if let Err(error) = outcome {
            warn!(token = token.0, %error, "actor_error");
            self.close(token, "error");
        }
    }

    /// Handle writable event
    fn handle_write(&mut self, token: Token) {
        let Some(actor) = self.actors.get_mut(&token) else {
            return;
        };

        let conn = actor.bridge.transport_mut();
        if let Err(e) = conn.flush_pending() {
            warn!(token = token.0, error = %e, "actor_error");
            self.close(token, "error");
            return;
        }

        if actor.read_closed && conn.write_pending() == 0 {
            self.close(token, "closed by peer");
        }
    }

    fn sweep_idle(&mut self) {
        let Some(timeout) = self.options.idle_timeout else {
            return;
        };

        let idle: Vec<Token> = self
            .actors
            .iter()
            .filter(|(_, actor)| actor.last_activity.elapsed() >= timeout)
            .map(|(token, _)| *token)
            .collect();

        for token in idle {
            self.close(token, "idle timeout");
        }
    }

    fn close(&mut self, token: Token, reason: &str) {
        if let Some(mut actor) = self.actors.remove(&token) {
            retire(self.poll.registry(), token, actor.bridge.transport_mut(), reason);
        }
    }
}

/// Deregister a connection that is about to be dropped and log its removal.
fn retire(registry: &Registry, token: Token, conn: &mut Connection, reason: &str) {
    if let Err(e) = conn.deregister(registry) {
        debug!(token = token.0, error = %e, "deregister failed");
    }
    info!(peer = %conn.peer(), token = token.0, reason, "del_actor");
}
