//! Listener/stream seam.
//!
//! Both sides are non-blocking. `accept` returns `Ok(None)` when no peer
//! is waiting; `read`/`write` fail with `WouldBlock` when the socket
//! cannot make progress, which the transport treats as "no data".

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

/// One connected peer.
pub trait PeerStream {
    /// Read available bytes. `Ok(0)` means the peer closed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much as the peer accepts now.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Peer description for logs.
    fn peer(&self) -> String;

    /// Close the connection. Errors are ignored.
    fn shutdown(&mut self) {}
}

/// Source of peers.
pub trait PeerListener {
    type Stream: PeerStream;

    /// Accept one waiting peer without blocking.
    fn accept(&mut self) -> io::Result<Option<Self::Stream>>;

    /// Local endpoint description for logs and diagnostics.
    fn local_addr(&self) -> String;
}

// ─── TCP ────────────────────────────────────────────────────────────

/// Non-blocking TCP listener.
#[derive(Debug)]
pub struct TcpPeerListener {
    listener: TcpListener,
}

impl TcpPeerListener {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!(addr = %listener.local_addr()?, "command listener bound");
        Ok(Self { listener })
    }

    pub fn socket_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl PeerListener for TcpPeerListener {
    type Stream = TcpPeerStream;

    fn accept(&mut self) -> io::Result<Option<TcpPeerStream>> {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                debug!(%addr, "peer accepted");
                Ok(Some(TcpPeerStream { stream, addr }))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> String {
        self.listener
            .local_addr()
            .map_or_else(|_| "unbound".to_string(), |a| a.to_string())
    }
}

/// Non-blocking TCP peer.
#[derive(Debug)]
pub struct TcpPeerStream {
    stream: TcpStream,
    addr: SocketAddr,
}

impl PeerStream for TcpPeerStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.stream.write(bytes)
    }

    fn peer(&self) -> String {
        self.addr.to_string()
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}
