//! A single-threaded HTTP/1.0 server with regex routing
//!
//! Requests are matched against an ordered table of regular expressions; the first
//! matching route's [`RequestHandler`] is called with the request and the substrings its
//! pattern captured. Everything runs inside a [`reactor_http::reactor::IoLoop`], which
//! can drive an [`reactor_http::client::AsyncHttpClient`] at the same time.
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use reactor_http::reactor::IoLoop;
//! use reactor_web::{AsyncHttpServer, get_fn, post_fn};
//!
//! let mut io_loop = IoLoop::new()?;
//! let server = AsyncHttpServer::bind(&mut io_loop, "127.0.0.1:8080")?;
//!
//! server.add_route("^/a/([0-9]+)$", get_fn(|request, _args| request.reply(StatusCode::OK, "A")))?;
//! server.add_route("^/b/([0-9]+)$", post_fn(|request, args| {
//!     let body = format!("{} {}", args[0], request.body().len());
//!     request.reply(StatusCode::OK, body);
//! }))?;
//!
//! io_loop.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod handler;
mod server;

pub mod router;

pub use handler::{FnHandler, RequestHandler, get_fn, post_fn};
pub use reactor_http::protocol::{Request, Response};
pub use router::{Router, RouterError};
pub use server::{AsyncHttpServer, DEFAULT_BACKLOG, ServerBuilder, ServerError};
