use std::collections::HashMap;
use std::fmt;
use std::io::{self, ErrorKind};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::event::Event;
use mio::unix::SourceFd;
use mio::{Events, Poll, Token, Waker};
use socket2::SockRef;
use tracing::{debug, trace};

use crate::reactor::{Interest, IoHandler, Registration};

/// Default number of readiness events collected per wait.
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

const WAKE_TOKEN: Token = Token(usize::MAX);

/// Single-threaded, edge-triggered readiness loop.
///
/// Each registered fd maps to exactly one [`Registration`]. Components receive the loop in
/// their callbacks, so registering, re-registering and unregistering happen in place while
/// events are being dispatched.
pub struct IoLoop {
    poll: Poll,
    events: Events,
    registrations: HashMap<RawFd, Registration>,
    waker: Arc<Waker>,
    stopped: Arc<AtomicBool>,
}

/// Asks a running [`IoLoop`] to return from [`IoLoop::run`]. Usable from any thread.
#[derive(Clone)]
pub struct StopHandle {
    waker: Arc<Waker>,
    stopped: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy)]
struct Readiness {
    readable: bool,
    writable: bool,
    hangup: bool,
}

impl From<&Event> for Readiness {
    fn from(event: &Event) -> Self {
        Self {
            // a half-closed peer still has to be drained, so RDHUP counts as readable
            readable: event.is_readable() || event.is_read_closed(),
            writable: event.is_writable(),
            hangup: event.is_error() || (event.is_read_closed() && event.is_write_closed()),
        }
    }
}

impl IoLoop {
    /// # Errors
    ///
    /// Fails if the epoll instance or its waker cannot be created.
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// # Errors
    ///
    /// Fails if the epoll instance or its waker cannot be created.
    pub fn with_capacity(events: usize) -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Waker::new(poll.registry(), WAKE_TOKEN)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(events.max(1)),
            registrations: HashMap::new(),
            waker: Arc::new(waker),
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Puts `source` into non-blocking mode and routes its readiness to `handler`.
    ///
    /// Registering an fd that is already known replaces the previous registration, which
    /// is returned.
    ///
    /// # Errors
    ///
    /// Fails if the fd cannot be switched to non-blocking mode or added to epoll. The
    /// previous registration, if any, is gone in that case.
    pub fn register<S>(&mut self, source: &S, handler: Rc<dyn IoHandler>, interest: Interest) -> io::Result<Option<Registration>>
    where
        S: AsFd,
    {
        let fd = source.as_fd().as_raw_fd();
        let previous = self.unregister(fd)?;

        SockRef::from(source).set_nonblocking(true)?;
        self.poll.registry().register(&mut SourceFd(&fd), token(fd), interest.into())?;
        self.registrations.insert(fd, Registration::new(handler, interest));

        trace!(fd, ?interest, replaced = previous.is_some(), "fd registered");
        Ok(previous)
    }

    /// Switches `fd` to `interest`, keeping its handler.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `fd` is not registered, or the error epoll reported.
    pub fn reregister(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        let Some(registration) = self.registrations.get_mut(&fd) else {
            return Err(io::Error::new(ErrorKind::NotFound, format!("fd {fd} is not registered")));
        };

        self.poll.registry().reregister(&mut SourceFd(&fd), token(fd), interest.into())?;
        registration.interest = interest;

        trace!(fd, ?interest, "fd re-registered");
        Ok(())
    }

    /// Stops watching `fd`. Unknown fds are a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// Returns the error epoll reported, except for an fd the kernel already forgot.
    pub fn unregister(&mut self, fd: RawFd) -> io::Result<Option<Registration>> {
        let Some(registration) = self.registrations.remove(&fd) else {
            return Ok(None);
        };

        match self.poll.registry().deregister(&mut SourceFd(&fd)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        trace!(fd, "fd unregistered");
        Ok(Some(registration))
    }

    pub fn registration(&self, fd: RawFd) -> Option<&Registration> {
        self.registrations.get(&fd)
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.registrations.contains_key(&fd)
    }

    /// Number of registered fds.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { waker: Arc::clone(&self.waker), stopped: Arc::clone(&self.stopped) }
    }

    /// Dispatches readiness events until a [`StopHandle`] fires.
    ///
    /// # Errors
    ///
    /// Returns the first error from waiting on epoll, other than an interrupted wait.
    pub fn run(&mut self) -> io::Result<()> {
        debug!(registrations = self.registrations.len(), "io loop running");
        while !self.stopped.load(Ordering::Acquire) {
            self.run_once(None)?;
        }
        self.stopped.store(false, Ordering::Release);
        debug!("io loop stopped");
        Ok(())
    }

    /// Waits up to `timeout` for readiness and dispatches one batch of events.
    ///
    /// For each ready fd, a hangup or error is reported through `on_close` and the fd is
    /// unregistered; otherwise write readiness takes precedence over read readiness. Events
    /// for fds unregistered earlier in the same batch are skipped.
    ///
    /// Returns the number of fd events in the batch.
    ///
    /// # Errors
    ///
    /// Returns the error from waiting on epoll. An interrupted wait is an empty batch.
    pub fn run_once(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e),
        }

        // handlers need `&mut self`, so the batch is detached from `self.events` first
        let ready: Vec<(RawFd, Readiness)> = self
            .events
            .iter()
            .filter(|event| event.token() != WAKE_TOKEN)
            .filter_map(|event| RawFd::try_from(event.token().0).ok().map(|fd| (fd, Readiness::from(event))))
            .collect();

        for &(fd, readiness) in &ready {
            self.dispatch(fd, readiness);
        }
        Ok(ready.len())
    }

    fn dispatch(&mut self, fd: RawFd, readiness: Readiness) {
        let Some(handler) = self.registrations.get(&fd).map(|registration| Rc::clone(&registration.handler)) else {
            trace!(fd, "event for unregistered fd skipped");
            return;
        };

        if readiness.hangup {
            trace!(fd, "hangup");
            handler.on_close(self, fd);
            if let Err(e) = self.unregister(fd) {
                debug!(fd, cause = %e, "failed to unregister closed fd");
            }
        } else if readiness.writable {
            handler.on_write(self, fd);
        } else if readiness.readable {
            handler.on_read(self, fd);
        }
    }
}

impl fmt::Debug for IoLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoLoop")
            .field("registrations", &self.registrations)
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl StopHandle {
    /// Makes [`IoLoop::run`] return once the current batch is dispatched.
    ///
    /// # Errors
    ///
    /// Fails if the loop's waker cannot be signalled.
    pub fn stop(&self) -> io::Result<()> {
        self.stopped.store(true, Ordering::Release);
        self.waker.wake()
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle").field("stopped", &self.stopped.load(Ordering::Relaxed)).finish_non_exhaustive()
    }
}

fn token(fd: RawFd) -> Token {
    // registered fds are always non-negative
    Token(usize::try_from(fd).unwrap_or_default())
}
