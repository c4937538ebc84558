//! In-process loopback transport.
//!
//! `MemoryListener` plays the role of the TCP listener; a
//! `MemoryConnector` opens `MemoryClient`s against it. Clients can close
//! their end or throttle what the device side may write, which is how
//! tests reproduce peer loss and partial sends.

use super::stream::{PeerListener, PeerStream};
use maquette_common::consts::HEARTBEAT_MARKER;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
struct Pipe {
    to_device: VecDeque<u8>,
    to_client: Vec<u8>,
    closed: bool,
    /// Bytes the device side may still write. `None` is unlimited.
    write_budget: Option<usize>,
}

type Backlog = Arc<Mutex<VecDeque<MemoryStream>>>;

/// Listener end of the loopback.
#[derive(Debug, Default)]
pub struct MemoryListener {
    backlog: Backlog,
    ids: Arc<AtomicU32>,
}

impl MemoryListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used to open clients against this listener.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            backlog: Arc::clone(&self.backlog),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl PeerListener for MemoryListener {
    type Stream = MemoryStream;

    fn accept(&mut self) -> io::Result<Option<MemoryStream>> {
        Ok(self.backlog.lock().pop_front())
    }

    fn local_addr(&self) -> String {
        "memory".to_string()
    }
}

/// Opens loopback clients.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    backlog: Backlog,
    ids: Arc<AtomicU32>,
}

impl MemoryConnector {
    /// Queue a new client. It becomes connected when the transport
    /// next accepts.
    pub fn connect(&self) -> MemoryClient {
        let pipe = Arc::new(Mutex::new(Pipe::default()));
        let id = self.ids.fetch_add(1, Ordering::Relaxed);
        self.backlog.lock().push_back(MemoryStream {
            pipe: Arc::clone(&pipe),
            id,
        });
        MemoryClient { pipe }
    }
}

/// Device side of one loopback connection.
#[derive(Debug)]
pub struct MemoryStream {
    pipe: Arc<Mutex<Pipe>>,
    id: u32,
}

impl PeerStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.lock();
        if pipe.to_device.is_empty() {
            return if pipe.closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let n = buf.len().min(pipe.to_device.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.to_device.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.lock();
        if pipe.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let n = pipe.write_budget.map_or(bytes.len(), |b| b.min(bytes.len()));
        if n == 0 && !bytes.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        if let Some(budget) = pipe.write_budget.as_mut() {
            *budget -= n;
        }
        pipe.to_client.extend_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn peer(&self) -> String {
        format!("memory#{}", self.id)
    }

    fn shutdown(&mut self) {
        self.pipe.lock().closed = true;
    }
}

/// Host side of one loopback connection.
#[derive(Debug, Clone)]
pub struct MemoryClient {
    pipe: Arc<Mutex<Pipe>>,
}

impl MemoryClient {
    pub fn send(&self, bytes: &[u8]) {
        self.pipe.lock().to_device.extend(bytes.iter().copied());
    }

    /// Send `line` followed by `\n`.
    pub fn send_line(&self, line: &str) {
        let mut pipe = self.pipe.lock();
        pipe.to_device.extend(line.bytes());
        pipe.to_device.push_back(b'\n');
    }

    /// Drain everything the device wrote, heartbeats included.
    pub fn take_received(&self) -> Vec<u8> {
        std::mem::take(&mut self.pipe.lock().to_client)
    }

    /// Drain received text with heartbeat markers removed.
    pub fn take_text(&self) -> String {
        let raw = self.take_received();
        let mut text = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i..].starts_with(&HEARTBEAT_MARKER) {
                i += HEARTBEAT_MARKER.len();
            } else {
                text.push(raw[i]);
                i += 1;
            }
        }
        String::from_utf8_lossy(&text).into_owned()
    }

    /// Drain received text split into lines.
    pub fn take_lines(&self) -> Vec<String> {
        self.take_text().lines().map(str::to_string).collect()
    }

    /// Close the host side. The device reads end-of-stream.
    pub fn close(&self) {
        self.pipe.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.lock().closed
    }

    /// Limit how many more bytes the device may write. `None` lifts it.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.pipe.lock().write_budget = budget;
    }
}
