//! Pooled byte buffers for the receive and send paths.
//!
//! Receive buffers are fixed at [`RECV_BUFFER_LEN`] bytes, one per live
//! connection, and go back to the pool when the connection's driver drops
//! them. Send buffers are short-lived copies of a single outbound line.

use parking_lot::Mutex;
use slirc_wire::frame_lines;
use slirc_wire::limits::RECV_BUFFER_LEN;
use std::sync::Arc;

/// A free list of byte vectors of at least `buf_len` capacity.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    buf_len: usize,
    max_pooled: usize,
}

impl BufferPool {
    pub fn new(buf_len: usize, max_pooled: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::new()),
            buf_len,
            max_pooled,
        })
    }

    /// Pool for receive buffers.
    pub fn for_receive(max_pooled: usize) -> Arc<Self> {
        Self::new(RECV_BUFFER_LEN, max_pooled)
    }

    /// An empty vector with at least `buf_len` bytes of capacity.
    pub fn take(&self) -> Vec<u8> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buf_len))
    }

    /// Return a vector to the pool. Oversized or surplus vectors are freed.
    pub fn give(&self, mut buf: Vec<u8>) {
        if buf.capacity() < self.buf_len || buf.capacity() > self.buf_len * 4 {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(buf);
        }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Take a receive buffer sized to this pool's buffer length.
    pub fn recv_buffer(self: &Arc<Self>) -> RecvBuffer {
        let mut buf = self.take();
        buf.resize(self.buf_len, 0);
        RecvBuffer {
            buf,
            valid: 0,
            pool: Arc::clone(self),
        }
    }
}

/// The receive buffer filled with no complete line in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

/// A connection-owned receive buffer. Returns itself to its pool on drop.
#[derive(Debug)]
pub struct RecvBuffer {
    buf: Vec<u8>,
    valid: usize,
    pool: Arc<BufferPool>,
}

impl RecvBuffer {
    /// Free space after the valid region, for a transport to read into.
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.valid..]
    }

    /// Mark `n` bytes of [`spare`](Self::spare) as filled.
    pub fn commit(&mut self, n: usize) {
        self.valid = (self.valid + n).min(self.buf.len());
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.valid
    }

    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// Deliver every complete line and compact the remainder to the front.
    ///
    /// Fails when the buffer is full and still holds no line terminator.
    pub fn drain_lines<F: FnMut(&[u8])>(&mut self, on_line: F) -> Result<(), Overflow> {
        let used = frame_lines(&self.buf, self.valid, on_line);
        if used > 0 {
            self.buf.copy_within(used..self.valid, 0);
            self.valid -= used;
        }
        if self.valid == self.buf.len() {
            return Err(Overflow);
        }
        Ok(())
    }

    /// Deliver the unterminated remainder as a final line and empty the buffer.
    pub fn flush_partial<F: FnMut(&[u8])>(&mut self, mut on_line: F) {
        let pending = &self.buf[..self.valid];
        let line = pending.strip_suffix(b"\r").unwrap_or(pending);
        if !line.is_empty() {
            on_line(line);
        }
        self.valid = 0;
    }

    /// Append `data`, delivering lines whenever the buffer fills up.
    pub fn extend<F: FnMut(&[u8])>(&mut self, mut data: &[u8], mut on_line: F) -> Result<(), Overflow> {
        while !data.is_empty() {
            let spare = self.spare();
            let n = spare.len().min(data.len());
            spare[..n].copy_from_slice(&data[..n]);
            self.commit(n);
            data = &data[n..];
            self.drain_lines(&mut on_line)?;
        }
        Ok(())
    }
}

impl Drop for RecvBuffer {
    fn drop(&mut self) {
        self.pool.give(std::mem::take(&mut self.buf));
    }
}
