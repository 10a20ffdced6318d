//! Connection handling dengan buffered write
//!
//! One accepted TCP stream, used by its actor as the bridge's
//! `StreamTransport`. Reads go straight into a buffer owned by the caller;
//! writes that the socket cannot take right now are parked in
//! `write_buffer` and flushed on the next writable event.

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::bridge::StreamTransport;

/// Cap for bytes parked while the peer is not reading
const MAX_PENDING_WRITE: usize = 1024 * 1024; // 1MB

/// Socket buffer sizes (SO_SNDBUF / SO_RCVBUF)
#[cfg(unix)]
const SOCKET_BUFFER_SIZE: libc::c_int = 256 * 1024; // 256KB

/// Non-blocking TCP connection
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    write_buffer: Vec<u8>,
}

impl Connection {
    /// Wrap accepted stream
    pub fn new(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        // Disable Nagle's algorithm untuk lower latency
        stream.set_nodelay(true)?;

        #[cfg(unix)]
        tune_socket_buffers(&stream);

        Ok(Self {
            stream,
            peer,
            write_buffer: Vec::new(),
        })
    }

    pub fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        registry.register(
            &mut self.stream,
            token,
            Interest::READABLE | Interest::WRITABLE,
        )
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Read satu chunk ke `buf`.
    ///
    /// Returns `Ok(0)` when nothing is available right now and
    /// `ConnectionReset` once the peer has closed its side.
    pub fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream.read(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "Connection closed",
                    ))
                }
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(0),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Flush parked bytes ke socket
    pub fn flush_pending(&mut self) -> io::Result<()> {
        while !self.write_buffer.is_empty() {
            match self.stream.write(&self.write_buffer) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "Failed to write to socket",
                    ));
                }
                Ok(n) => {
                    self.write_buffer.drain(..n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Bytes pending in write buffer
    #[inline(always)]
    pub fn write_pending(&self) -> usize {
        self.write_buffer.len()
    }

    fn park(&mut self, data: &[u8]) -> io::Result<()> {
        if self.write_buffer.len() + data.len() > MAX_PENDING_WRITE {
            return Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "peer is not reading, write buffer full",
            ));
        }
        self.write_buffer.extend_from_slice(data);
        Ok(())
    }
}

impl StreamTransport for Connection {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.flush_pending()?;

        // Preserve ordering behind anything still parked
        if !self.write_buffer.is_empty() {
            return self.park(data);
        }

        let mut written = 0;
        while written < data.len() {
            match self.stream.write(&data[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "Failed to write to socket",
                    ));
                }
                Ok(n) => written += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return self.park(&data[written..]);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Set socket buffer sizes untuk throughput.
/// Errors are ignored; not all platforms accept these values.
#[cfg(unix)]
fn tune_socket_buffers(stream: &TcpStream) {
    use std::os::unix::io::AsRawFd;

    let fd = stream.as_raw_fd();
    let optval = SOCKET_BUFFER_SIZE;
    for opt in [libc::SO_SNDBUF, libc::SO_RCVBUF] {
        // SAFETY: fd is a live socket owned by `stream`, optval outlives the call
        unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                opt,
                &optval as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            );
        }
    }
}
