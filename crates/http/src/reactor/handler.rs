use std::fmt;
use std::os::fd::RawFd;
use std::rc::Rc;

use crate::reactor::IoLoop;

/// A component that reacts to readiness of the fds it registered.
///
/// Callbacks run to completion on the reactor thread, one at a time. They receive the
/// loop so they can switch an fd's interest, register new fds or drop registrations.
#[cfg_attr(test, mockall::automock)]
pub trait IoHandler {
    /// `fd` has data to read, or the peer closed its write side.
    fn on_read(&self, io_loop: &mut IoLoop, fd: RawFd);

    /// `fd` can accept more bytes.
    fn on_write(&self, io_loop: &mut IoLoop, fd: RawFd);

    /// `fd` reported an error or a full hangup. The loop drops the registration after
    /// this returns; the handler is expected to release the socket.
    fn on_close(&self, io_loop: &mut IoLoop, fd: RawFd);
}

/// The single readiness kind an fd is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

impl From<Interest> for mio::Interest {
    fn from(interest: Interest) -> Self {
        match interest {
            Interest::Read => mio::Interest::READABLE,
            Interest::Write => mio::Interest::WRITABLE,
        }
    }
}

/// The component an fd dispatches to, and what it waits for.
#[derive(Clone)]
pub struct Registration {
    pub(super) handler: Rc<dyn IoHandler>,
    pub(super) interest: Interest,
}

impl Registration {
    pub(crate) fn new(handler: Rc<dyn IoHandler>, interest: Interest) -> Self {
        Self { handler, interest }
    }

    pub fn handler(&self) -> &Rc<dyn IoHandler> {
        &self.handler
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("interest", &self.interest).finish_non_exhaustive()
    }
}
