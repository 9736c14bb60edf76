//! Edge-triggered readiness reactor
//!
//! One [`IoLoop`] per thread multiplexes every socket the client and server own. Each fd
//! is registered for exactly one [`Interest`] at a time and dispatches to the
//! [`IoHandler`] that registered it.
//!
//! Notifications are edge-triggered: a handler that does not drain a readable fd (or fill
//! a writable one) until the kernel reports "would block" will not be woken again for the
//! data it left behind.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use reactor_http::reactor::IoLoop;
//!
//! let mut io_loop = IoLoop::new()?;
//! let stop = io_loop.stop_handle();
//! std::thread::spawn(move || {
//!     std::thread::sleep(Duration::from_secs(1));
//!     stop.stop().unwrap();
//! });
//! io_loop.run()?;
//! # Ok::<(), std::io::Error>(())
//! ```

mod handler;
mod io_loop;

pub use handler::{Interest, IoHandler, Registration};
pub use io_loop::{DEFAULT_EVENT_CAPACITY, IoLoop, StopHandle};

#[cfg(test)]
pub use handler::MockIoHandler;
