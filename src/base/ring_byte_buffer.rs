use std::cmp::min;
use std::io::Read;

/// A ring byte buffer sitting between the serial stream and the line framer.
///
/// The framer consumes bytes one at a time, but the transport may deliver
/// them in arbitrary chunks; the buffer absorbs whatever a single `read`
/// call produced so that later bytes of the same chunk do not have to wait
/// for another stream read.
#[derive(Debug, Clone, PartialEq)]
pub struct RingByteBuffer {
    buf: Vec<u8>,
    head: usize,
    size: usize,
}

impl RingByteBuffer {
    /// Creates a new `RingByteBuffer` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> RingByteBuffer {
        RingByteBuffer {
            buf: vec![0; capacity],
            head: 0,
            size: 0,
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the buffer contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the amount of free space in the buffer in bytes.
    pub fn free_space(&self) -> usize {
        self.buf.len() - self.size
    }

    /// Removes and returns the oldest buffered byte, if any.
    pub fn pop(&mut self) -> Option<u8> {
        if self.size == 0 {
            return None;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % self.buf.len();
        self.size -= 1;
        Some(byte)
    }

    /// Slice of free space starting at the write position, up to the end of
    /// the backing storage (a second slice may wrap around to the front).
    fn current_write_slice(&mut self) -> &mut [u8] {
        let tail = (self.head + self.size) % self.buf.len();
        let end = min(self.buf.len(), tail + self.free_space());
        &mut self.buf[tail..end]
    }

    fn partial_fill_from(&mut self, upstream: &mut impl Read) -> std::io::Result<usize> {
        if self.current_write_slice().is_empty() {
            return Ok(0);
        }

        match upstream.read(self.current_write_slice()) {
            Ok(read) => {
                self.size += read;
                Ok(read)
            }
            Err(err) => {
                // A timed-out or would-block read just means no data yet.
                if err.kind() == std::io::ErrorKind::TimedOut
                    || err.kind() == std::io::ErrorKind::WouldBlock
                {
                    Ok(0)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Reads from an upstream source into the buffer's free space, handling
    /// the wrap-around at the end of the backing storage. Returns the total
    /// number of bytes taken from the upstream source.
    pub fn fill_from(&mut self, upstream: &mut impl Read) -> std::io::Result<usize> {
        let read = self.partial_fill_from(upstream)?;
        let latter_read = self.partial_fill_from(upstream)?;
        Ok(read + latter_read)
    }
}
