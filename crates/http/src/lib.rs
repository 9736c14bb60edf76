//! A single-threaded HTTP/1.0 toolkit on an edge-triggered epoll reactor
//!
//! This crate provides the pieces shared by both ends of a connection: the readiness
//! reactor, the connection buffers with their partial-I/O retry loops, the HTTP/1.0 wire
//! codec and a callback-based client. The server lives in the `reactor-web` crate.
//!
//! Every exchange is one request and one response on a fresh connection. Bodies are
//! framed by `Content-Length` only.
//!
//! # Example
//!
//! ```no_run
//! use http::Method;
//! use reactor_http::client::{AsyncHttpClient, response_fn};
//! use reactor_http::reactor::IoLoop;
//! use tracing::info;
//!
//! let mut io_loop = IoLoop::new()?;
//! let client = AsyncHttpClient::new();
//! let stop = io_loop.stop_handle();
//!
//! client.fetch(&mut io_loop, "127.0.0.1", 8080, Method::POST, "/b/10", "bbb", response_fn(move |response| {
//!     info!(status = %response.status(), "got response");
//!     stop.stop().unwrap();
//! }))?;
//!
//! io_loop.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`reactor`]: the [`reactor::IoLoop`] and the [`reactor::IoHandler`] callbacks
//! - [`connection`]: per-socket read/write buffers
//! - [`codec`]: request and response framing
//! - [`protocol`]: request, response, status table and errors
//! - [`client`]: the asynchronous client
//!
//! # Limitations
//!
//! - HTTP/1.0 only, no keep-alive
//! - `Content-Length` framing only, no chunked transfer encoding
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;
pub mod reactor;

mod utils;
pub(crate) use utils::ensure;
