//! Reactor-driven HTTP/1.0 server
//!
//! Every accepted connection goes through the same three phases, all inside
//! [`IoLoop`] callbacks:
//!
//! 1. reading: drain the socket and try to decode a request after each read
//! 2. dispatching: route the request, run the handler, encode its reply
//! 3. writing: flush the reply, then close the connection
//!
//! A request that cannot be decoded gets `500`; a peer that closes before sending a full
//! request is dropped without a reply.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::rc::{Rc, Weak};

use http::{Method, StatusCode};
use mio::net::{TcpListener, TcpStream};
use reactor_http::codec::{RequestDecoder, ResponseEncoder};
use reactor_http::connection::{Connection, ReadStatus, WriteStatus};
use reactor_http::protocol::{ParseError, Request, Response};
use reactor_http::reactor::{Interest, IoHandler, IoLoop};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, trace, warn};

use crate::handler::RequestHandler;
use crate::router::{Router, RouterError};

/// Listen backlog used unless [`ServerBuilder::backlog`] says otherwise.
pub const DEFAULT_BACKLOG: i32 = 128;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("address must be set")]
    MissingAddress,

    #[error("failed to resolve listen address: {source}")]
    Resolve {
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to register listener: {source}")]
    Register {
        #[source]
        source: io::Error,
    },
}

pub struct ServerBuilder {
    address: Option<io::Result<Vec<SocketAddr>>>,
    backlog: i32,
    router: Option<Router>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, backlog: DEFAULT_BACKLOG, router: None }
    }

    /// Addresses to try, in order; the first one that binds is used.
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Starts from a pre-built route table instead of an empty one.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Binds the listener and registers it with `io_loop`.
    ///
    /// # Errors
    ///
    /// Fails if no address was set, it cannot be resolved, none of its socket addresses
    /// can be bound, or the listener cannot be registered.
    pub fn build(self, io_loop: &mut IoLoop) -> Result<AsyncHttpServer, ServerError> {
        let addrs = self.address.ok_or(ServerError::MissingAddress)?.map_err(|source| ServerError::Resolve { source })?;

        let mut last_error = None;
        let mut bound = None;
        for addr in addrs {
            match listen(addr, self.backlog) {
                Ok(listener) => {
                    bound = Some(listener);
                    break;
                }
                Err(source) => {
                    warn!(%addr, cause = %source, "bind failed");
                    last_error = Some(ServerError::Bind { addr, source });
                }
            }
        }
        let (listener, local_addr) = bound.ok_or_else(|| last_error.unwrap_or(ServerError::MissingAddress))?;

        let inner = Rc::new_cyclic(|this| ServerInner {
            this: this.clone(),
            listener,
            local_addr,
            router: RefCell::new(self.router.unwrap_or_default()),
            connections: RefCell::new(HashMap::new()),
        });

        io_loop
            .register(&inner.listener, Rc::clone(&inner) as Rc<dyn IoHandler>, Interest::Read)
            .map_err(|source| ServerError::Register { source })?;

        info!(%local_addr, backlog = self.backlog, "server listening");
        Ok(AsyncHttpServer { inner })
    }
}

fn listen(addr: SocketAddr, backlog: i32) -> io::Result<(TcpListener, SocketAddr)> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let listener = TcpListener::from_std(socket.into());
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

/// A single-threaded HTTP/1.0 server.
///
/// All work happens in the [`IoLoop`] the server was built with. Cloning is cheap and
/// every clone controls the same listener and route table.
#[derive(Clone)]
pub struct AsyncHttpServer {
    inner: Rc<ServerInner>,
}

struct ServerInner {
    this: Weak<ServerInner>,
    listener: TcpListener,
    local_addr: SocketAddr,
    router: RefCell<Router>,
    connections: RefCell<HashMap<RawFd, ServerConnection>>,
}

struct ServerConnection {
    connection: Connection<TcpStream>,
    peer: SocketAddr,
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
}

enum ReadOutcome {
    Pending,
    Request(Request),
    Malformed(ParseError),
    Closed,
    Failed(io::Error),
}

impl AsyncHttpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Shorthand for a server on `address` with an empty route table.
    ///
    /// # Errors
    ///
    /// See [`ServerBuilder::build`].
    pub fn bind<A: ToSocketAddrs>(io_loop: &mut IoLoop, address: A) -> Result<Self, ServerError> {
        Self::builder().address(address).build(io_loop)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Appends a route; safe to call from inside a running handler.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] if `pattern` does not compile.
    pub fn add_route<H>(&self, pattern: &str, handler: H) -> Result<(), RouterError>
    where
        H: RequestHandler + 'static,
    {
        self.inner.router.borrow_mut().add_route(pattern, handler)
    }

    /// Removes the first route registered with exactly `pattern`.
    pub fn remove_route(&self, pattern: &str) -> Option<Rc<dyn RequestHandler>> {
        self.inner.router.borrow_mut().remove_route(pattern)
    }

    /// Number of connections that have been accepted and not yet closed.
    pub fn connections(&self) -> usize {
        self.inner.connections.borrow().len()
    }

    /// Stops accepting and drops every open connection without replying.
    pub fn shutdown(&self, io_loop: &mut IoLoop) {
        if let Err(e) = io_loop.unregister(self.inner.listener.as_raw_fd()) {
            warn!(cause = %e, "failed to unregister listener");
        }
        let open: Vec<RawFd> = self.inner.connections.borrow().keys().copied().collect();
        for fd in open {
            self.inner.close(io_loop, fd);
        }
        info!(local_addr = %self.inner.local_addr, "server shut down");
    }
}

impl ServerInner {
    fn accept(&self, io_loop: &mut IoLoop) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.open(io_loop, stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    // queued connections get no new edge until the listener is re-armed
                    let fd = self.listener.as_raw_fd();
                    warn!(fd, local_addr = %self.local_addr, cause = %e, "failed to accept, re-arming listener");
                    if let Err(e) = io_loop.reregister(fd, Interest::Read) {
                        warn!(fd, cause = %e, "failed to re-arm listener");
                    }
                    return;
                }
            }
        }
    }

    fn open(&self, io_loop: &mut IoLoop, stream: TcpStream, peer: SocketAddr) {
        let Some(this) = self.this.upgrade() else {
            return;
        };

        let fd = stream.as_raw_fd();
        if let Err(e) = io_loop.register(&stream, this as Rc<dyn IoHandler>, Interest::Read) {
            warn!(%peer, cause = %e, "failed to register connection");
            return;
        }

        trace!(fd, %peer, "connection accepted");
        let connection = ServerConnection {
            connection: Connection::new(stream),
            peer,
            decoder: RequestDecoder::new(),
            encoder: ResponseEncoder::new(),
        };
        self.connections.borrow_mut().insert(fd, connection);
    }

    fn read_request(&self, fd: RawFd) -> Option<ReadOutcome> {
        let mut connections = self.connections.borrow_mut();
        let ServerConnection { connection, decoder, .. } = connections.get_mut(&fd)?;

        let status = match connection.drain() {
            Ok(status) => status,
            Err(e) => return Some(ReadOutcome::Failed(e)),
        };

        let outcome = match decoder.decode(connection.buffers_mut().read_buf_mut()) {
            Ok(Some(request)) => ReadOutcome::Request(request.with_connection(fd)),
            Ok(None) if status == ReadStatus::Closed => ReadOutcome::Closed,
            Ok(None) => ReadOutcome::Pending,
            Err(e) => ReadOutcome::Malformed(e),
        };
        Some(outcome)
    }

    fn respond(&self, mut request: Request) -> Response {
        // the router borrow must end before user code runs, handlers may add or remove routes
        let route = self.router.borrow().resolve(request.path()).map(|(handler, args)| (Rc::clone(handler), args));
        let Some((handler, args)) = route else {
            debug!(path = request.path(), "no route");
            return Response::empty(StatusCode::NOT_FOUND);
        };

        if *request.method() == Method::GET {
            handler.get(&mut request, &args);
        } else if *request.method() == Method::POST {
            handler.post(&mut request, &args);
        } else {
            debug!(method = %request.method(), path = request.path(), "method not allowed");
            return Response::empty(StatusCode::METHOD_NOT_ALLOWED);
        }

        request.take_reply().unwrap_or_else(|| {
            warn!(method = %request.method(), path = request.path(), "handler did not reply");
            Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }

    fn send(&self, io_loop: &mut IoLoop, fd: RawFd, response: Response) {
        let encoded = {
            let mut connections = self.connections.borrow_mut();
            let Some(ServerConnection { connection, encoder, peer, .. }) = connections.get_mut(&fd) else {
                return;
            };
            debug!(fd, %peer, status = %response.status(), body_size = response.body().len(), "replying");

            let buffers = connection.buffers_mut();
            buffers.clear();
            encoder.encode(response, buffers.write_buf_mut())
        };

        if let Err(e) = encoded {
            warn!(fd, cause = %e, "failed to encode response");
            self.close(io_loop, fd);
        } else if let Err(e) = io_loop.reregister(fd, Interest::Write) {
            warn!(fd, cause = %e, "failed to switch connection to write");
            self.close(io_loop, fd);
        }
    }

    fn close(&self, io_loop: &mut IoLoop, fd: RawFd) {
        let closed = self.connections.borrow_mut().remove(&fd);
        if let Err(e) = io_loop.unregister(fd) {
            debug!(fd, cause = %e, "failed to unregister connection");
        }
        if let Some(closed) = closed {
            trace!(fd, peer = %closed.peer, "connection closed");
        }
    }
}

impl IoHandler for ServerInner {
    fn on_read(&self, io_loop: &mut IoLoop, fd: RawFd) {
        if fd == self.listener.as_raw_fd() {
            self.accept(io_loop);
            return;
        }

        match self.read_request(fd) {
            None | Some(ReadOutcome::Pending) => {}
            Some(ReadOutcome::Request(request)) => {
                debug!(fd, method = %request.method(), path = request.path(), body_size = request.body().len(), "request received");
                let response = self.respond(request);
                self.send(io_loop, fd, response);
            }
            Some(ReadOutcome::Malformed(e)) => {
                warn!(fd, cause = %e, "malformed request");
                self.send(io_loop, fd, Response::empty(StatusCode::INTERNAL_SERVER_ERROR));
            }
            Some(ReadOutcome::Closed) => {
                trace!(fd, "peer closed before sending a full request");
                self.close(io_loop, fd);
            }
            Some(ReadOutcome::Failed(e)) => {
                warn!(fd, cause = %e, "failed to read request");
                self.close(io_loop, fd);
            }
        }
    }

    fn on_write(&self, io_loop: &mut IoLoop, fd: RawFd) {
        let status = match self.connections.borrow_mut().get_mut(&fd) {
            Some(open) => open.connection.flush(),
            None => return,
        };

        match status {
            Ok(WriteStatus::Drained) => {
                trace!(fd, "response sent");
                self.close(io_loop, fd);
            }
            Ok(WriteStatus::WouldBlock) => {}
            Err(e) => {
                warn!(fd, cause = %e, "failed to write response");
                self.close(io_loop, fd);
            }
        }
    }

    fn on_close(&self, io_loop: &mut IoLoop, fd: RawFd) {
        if fd == self.listener.as_raw_fd() {
            warn!(local_addr = %self.local_addr, "listener failed, no longer accepting");
            return;
        }
        self.close(io_loop, fd);
    }
}

impl fmt::Debug for AsyncHttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHttpServer")
            .field("local_addr", &self.inner.local_addr)
            .field("router", &self.inner.router.borrow())
            .field("connections", &self.connections())
            .finish()
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("backlog", &self.backlog).field("router", &self.router).finish_non_exhaustive()
    }
}
