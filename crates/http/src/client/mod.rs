//! Callback-based HTTP/1.0 client
//!
//! [`AsyncHttpClient::fetch`] connects, queues the encoded request and returns right away.
//! The request is written and the response read from inside the [`IoLoop`]; once the
//! server closes the connection the buffered bytes are decoded and handed to the
//! [`ResponseHandler`].
//!
//! # Example
//!
//! ```no_run
//! use http::Method;
//! use reactor_http::client::{AsyncHttpClient, response_fn};
//! use reactor_http::reactor::IoLoop;
//!
//! let mut io_loop = IoLoop::new()?;
//! let client = AsyncHttpClient::new();
//! client.fetch(&mut io_loop, "localhost", 8080, Method::GET, "/a/10", "aaa", response_fn(|response| {
//!     println!("{} {:?}", response.status(), response.body());
//! }))?;
//! io_loop.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod handler;

pub use error::FetchError;
pub use handler::{ResponseFn, ResponseHandler, response_fn};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::net::ToSocketAddrs;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use bytes::Bytes;
use http::Method;
use mio::net::TcpStream;
use tokio_util::codec::Encoder;
use tracing::{debug, trace, warn};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::connection::{Connection, ReadStatus, WriteStatus};
use crate::protocol::Request;
use crate::reactor::{Interest, IoHandler, IoLoop};

/// Issues requests and delivers their responses through the [`IoLoop`].
///
/// Cloning is cheap; clones share the set of in-flight requests.
#[derive(Clone, Default)]
pub struct AsyncHttpClient {
    inner: Rc<ClientInner>,
}

#[derive(Default)]
struct ClientInner {
    connections: RefCell<HashMap<RawFd, ClientConnection>>,
}

struct ClientConnection {
    connection: Connection<TcpStream>,
    handler: Box<dyn ResponseHandler>,
    decoder: ResponseDecoder,
}

impl AsyncHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request to `host:port`.
    ///
    /// The connection is established before this returns; everything after that happens
    /// in `io_loop`, and `handler` is invoked from there exactly once.
    ///
    /// # Errors
    ///
    /// Fails without invoking `handler` if the host cannot be resolved, no address accepts
    /// the connection, or the socket cannot be registered.
    #[allow(clippy::too_many_arguments, reason = "one argument per request field plus the loop and handler")]
    pub fn fetch<H>(
        &self,
        io_loop: &mut IoLoop,
        host: &str,
        port: u16,
        method: Method,
        path: &str,
        body: impl Into<Bytes>,
        handler: H,
    ) -> Result<(), FetchError>
    where
        H: ResponseHandler + 'static,
    {
        let stream = connect(host, port)?;
        stream.set_nonblocking(true)?;
        let mut connection = Connection::new(TcpStream::from_std(stream));

        let request = Request::new(method, path, body);
        debug!(method = %request.method(), path = request.path(), host, port, "fetching");
        RequestEncoder.encode(request, connection.buffers_mut().write_buf_mut())?;

        let fd = connection.stream().as_raw_fd();
        io_loop
            .register(connection.stream(), Rc::clone(&self.inner) as Rc<dyn IoHandler>, Interest::Write)
            .map_err(|source| FetchError::Register { source })?;

        let pending = ClientConnection { connection, handler: Box::new(handler), decoder: ResponseDecoder };
        self.inner.connections.borrow_mut().insert(fd, pending);
        Ok(())
    }

    /// Number of requests whose handler has not been invoked yet.
    pub fn pending(&self) -> usize {
        self.inner.connections.borrow().len()
    }
}

fn connect(host: &str, port: u16) -> Result<std::net::TcpStream, FetchError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| FetchError::Resolve { host: host.to_owned(), port, source })?;

    let mut last_error = None;
    for addr in addrs {
        match std::net::TcpStream::connect(addr) {
            Ok(stream) => {
                trace!(%addr, "connected");
                return Ok(stream);
            }
            Err(source) => {
                debug!(%addr, cause = %source, "connect failed");
                last_error = Some(FetchError::Connect { addr, source });
            }
        }
    }
    Err(last_error.unwrap_or_else(|| FetchError::NoAddress { host: host.to_owned(), port }))
}

impl ClientInner {
    fn release(&self, io_loop: &mut IoLoop, fd: RawFd) -> Option<ClientConnection> {
        let released = self.connections.borrow_mut().remove(&fd);
        if let Err(e) = io_loop.unregister(fd) {
            warn!(fd, cause = %e, "failed to unregister client connection");
        }
        released
    }

    /// Decodes whatever the server sent before closing and reports it.
    fn finish(&self, io_loop: &mut IoLoop, fd: RawFd) {
        let Some(ClientConnection { mut connection, handler, mut decoder }) = self.release(io_loop, fd) else {
            return;
        };
        let mut received = mem::take(connection.buffers_mut().read_buf_mut());
        drop(connection);

        match decoder.finish(&mut received) {
            Ok(response) => {
                debug!(fd, status = %response.status(), body_size = response.body().len(), "response received");
                handler.handle(response);
            }
            Err(e) => {
                warn!(fd, cause = %e, "invalid response");
                handler.on_error(e.into());
            }
        }
    }

    fn fail(&self, io_loop: &mut IoLoop, fd: RawFd, error: FetchError) {
        if let Some(pending) = self.release(io_loop, fd) {
            warn!(fd, cause = %error, "fetch failed");
            drop(pending.connection);
            pending.handler.on_error(error);
        }
    }
}

impl IoHandler for ClientInner {
    fn on_read(&self, io_loop: &mut IoLoop, fd: RawFd) {
        let status = match self.connections.borrow_mut().get_mut(&fd) {
            Some(pending) => pending.connection.drain(),
            None => return,
        };

        match status {
            Ok(ReadStatus::WouldBlock) => {}
            Ok(ReadStatus::Closed) => self.finish(io_loop, fd),
            Err(e) => self.fail(io_loop, fd, e.into()),
        }
    }

    fn on_write(&self, io_loop: &mut IoLoop, fd: RawFd) {
        let status = {
            let mut connections = self.connections.borrow_mut();
            let Some(pending) = connections.get_mut(&fd) else {
                return;
            };
            let status = pending.connection.flush();
            if matches!(status, Ok(WriteStatus::Drained)) {
                pending.connection.buffers_mut().clear();
            }
            status
        };

        match status {
            Ok(WriteStatus::Drained) => {
                trace!(fd, "request sent");
                if let Err(e) = io_loop.reregister(fd, Interest::Read) {
                    self.fail(io_loop, fd, e.into());
                }
            }
            Ok(WriteStatus::WouldBlock) => {}
            Err(e) => self.fail(io_loop, fd, e.into()),
        }
    }

    fn on_close(&self, io_loop: &mut IoLoop, fd: RawFd) {
        // pick up anything that arrived together with the hangup
        let status = match self.connections.borrow_mut().get_mut(&fd) {
            Some(pending) => pending.connection.drain(),
            None => return,
        };

        match status {
            Ok(_) => self.finish(io_loop, fd),
            Err(e) => self.fail(io_loop, fd, e.into()),
        }
    }
}

impl fmt::Debug for AsyncHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHttpClient").field("pending", &self.pending()).finish()
    }
}
