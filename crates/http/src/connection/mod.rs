//! Connection buffering and the partial-I/O retry protocol
//!
//! Every socket owned by the client or the server is wrapped in a [`Connection`]: the
//! stream plus its [`ConnectionBuffers`]. Both are only touched from reactor callbacks for
//! that fd, so no locking is involved.
//!
//! # Components
//!
//! - [`ConnectionBuffers`]: read/write accumulators with the drain-until-would-block read
//!   loop and the write loop that tolerates short writes
//! - [`Connection`]: a stream bound to its buffers

mod buffers;

pub use buffers::{ConnectionBuffers, MAX_ZERO_WRITES, READ_CHUNK_SIZE, ReadStatus, WriteStatus};

use std::io::{self, Read, Write};

/// A non-blocking stream together with its pending input and output.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    buffers: ConnectionBuffers,
}

impl<S> Connection<S>
where
    S: Read + Write,
{
    pub fn new(stream: S) -> Self {
        Self { stream, buffers: ConnectionBuffers::new() }
    }

    /// Reads everything currently available into the read buffer.
    ///
    /// # Errors
    ///
    /// See [`ConnectionBuffers::drain_from`].
    pub fn drain(&mut self) -> io::Result<ReadStatus> {
        self.buffers.drain_from(&mut self.stream)
    }

    /// Writes as much of the write buffer as the stream accepts.
    ///
    /// # Errors
    ///
    /// See [`ConnectionBuffers::flush_to`].
    pub fn flush(&mut self) -> io::Result<WriteStatus> {
        self.buffers.flush_to(&mut self.stream)
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn buffers(&self) -> &ConnectionBuffers {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut ConnectionBuffers {
        &mut self.buffers
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}
