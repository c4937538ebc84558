//! Pending-write FIFO replayed after reconnect.

use super::TransportError;
use maquette_common::consts::{PENDING_WRITE_CHUNK, PENDING_WRITE_SLOTS};

type Chunk = heapless::Vec<u8, PENDING_WRITE_CHUNK>;

/// Bounded queue of unsent chunks. Overflow refuses the new chunk; the
/// oldest data is never dropped.
#[derive(Debug, Default)]
pub struct PendingWrites {
    queue: heapless::Deque<Chunk, PENDING_WRITE_SLOTS>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.queue.is_full() {
            return Err(TransportError::QueueFull);
        }
        let chunk =
            Chunk::from_slice(bytes).map_err(|_| TransportError::ChunkTooLarge(bytes.len()))?;
        self.queue
            .push_back(chunk)
            .map_err(|_| TransportError::QueueFull)
    }

    pub fn front(&self) -> Option<&[u8]> {
        self.queue.front().map(|c| c.as_slice())
    }

    /// Drop the first `sent` bytes of the front chunk, and the chunk
    /// itself once empty.
    pub fn consume_front(&mut self, sent: usize) {
        let Some(front) = self.queue.front_mut() else {
            return;
        };
        if sent >= front.len() {
            self.queue.pop_front();
        } else {
            let rest = front[sent..].to_vec();
            front.clear();
            // The rest is shorter than the chunk it came from.
            let _ = front.extend_from_slice(&rest);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total queued bytes.
    pub fn bytes(&self) -> usize {
        self.queue.iter().map(|c| c.len()).sum()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = PendingWrites::new();
        q.push(b"one").unwrap();
        q.push(b"two").unwrap();
        assert_eq!(q.front(), Some(&b"one"[..]));
        q.consume_front(3);
        assert_eq!(q.front(), Some(&b"two"[..]));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn partial_consume_keeps_rest() {
        let mut q = PendingWrites::new();
        q.push(b"OK:PONG\n").unwrap();
        q.consume_front(3);
        assert_eq!(q.front(), Some(&b"PONG\n"[..]));
        assert_eq!(q.bytes(), 5);
    }

    #[test]
    fn overflow_refuses_newest() {
        let mut q = PendingWrites::new();
        for i in 0..PENDING_WRITE_SLOTS {
            q.push(&[i as u8]).unwrap();
        }
        assert!(matches!(q.push(b"late"), Err(TransportError::QueueFull)));
        assert_eq!(q.front(), Some(&[0u8][..]));
    }

    #[test]
    fn oversized_chunk_refused() {
        let mut q = PendingWrites::new();
        let big = vec![b'x'; PENDING_WRITE_CHUNK + 1];
        assert!(matches!(
            q.push(&big),
            Err(TransportError::ChunkTooLarge(n)) if n == PENDING_WRITE_CHUNK + 1
        ));
        assert!(q.is_empty());
    }
}
