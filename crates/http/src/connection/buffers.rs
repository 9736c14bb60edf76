use std::io::{self, ErrorKind, Read, Write};

use bytes::{Buf, BytesMut};
use tracing::trace;

/// Size of the scratch buffer each `read` call fills.
pub const READ_CHUNK_SIZE: usize = 2048;

/// Consecutive zero-byte writes tolerated while data is still pending.
pub const MAX_ZERO_WRITES: usize = 3;

/// Why [`ConnectionBuffers::drain_from`] stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The socket has no more data right now.
    WouldBlock,
    /// The peer closed its side of the connection.
    Closed,
}

/// Why [`ConnectionBuffers::flush_to`] stopped writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every pending byte has been written.
    Drained,
    /// The socket can't take more data right now; bytes are still pending.
    WouldBlock,
}

/// Per-connection read and write accumulators.
///
/// Readiness is edge-triggered, so each notification must be followed by a drain that
/// runs until the operating system reports "would block". Anything left unread is
/// never signalled again.
#[derive(Debug, Default)]
pub struct ConnectionBuffers {
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl ConnectionBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_buf(&self) -> &BytesMut {
        &self.read_buf
    }

    pub fn read_buf_mut(&mut self) -> &mut BytesMut {
        &mut self.read_buf
    }

    pub fn write_buf(&self) -> &BytesMut {
        &self.write_buf
    }

    pub fn write_buf_mut(&mut self) -> &mut BytesMut {
        &mut self.write_buf
    }

    /// Clears both buffers so nothing from the previous phase leaks into the next one.
    pub fn clear(&mut self) {
        self.read_buf.clear();
        self.write_buf.clear();
    }

    /// Reads from `reader` until it would block or reaches end of stream, appending
    /// everything to the read buffer.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `WouldBlock` and `Interrupted`.
    pub fn drain_from<R: Read>(&mut self, reader: &mut R) -> io::Result<ReadStatus> {
        let mut scratch = [0u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut scratch) {
                Ok(0) => {
                    trace!(buffered = self.read_buf.len(), "peer closed");
                    return Ok(ReadStatus::Closed);
                }
                Ok(n) => self.read_buf.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    trace!(buffered = self.read_buf.len(), "read would block");
                    return Ok(ReadStatus::WouldBlock);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes the front of the write buffer to `writer` until the buffer is empty or the
    /// writer would block. Written bytes are removed from the buffer.
    ///
    /// # Errors
    ///
    /// Returns `WriteZero` after [`MAX_ZERO_WRITES`] consecutive writes that accepted
    /// nothing, and any I/O error other than `WouldBlock` and `Interrupted`.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W) -> io::Result<WriteStatus> {
        let mut zero_writes = 0;
        while !self.write_buf.is_empty() {
            match writer.write(&self.write_buf) {
                Ok(0) => {
                    zero_writes += 1;
                    if zero_writes >= MAX_ZERO_WRITES {
                        return Err(io::Error::new(ErrorKind::WriteZero, "socket keeps accepting zero bytes"));
                    }
                }
                Ok(n) => {
                    zero_writes = 0;
                    self.write_buf.advance(n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    trace!(pending = self.write_buf.len(), "write would block");
                    return Ok(WriteStatus::WouldBlock);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(WriteStatus::Drained)
    }
}
