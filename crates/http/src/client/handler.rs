use std::fmt;

use tracing::warn;

use crate::client::FetchError;
use crate::protocol::Response;

/// Receives the outcome of one fetch. Exactly one of the two methods is called, once.
pub trait ResponseHandler {
    fn handle(self: Box<Self>, response: Response);

    /// Called instead of [`ResponseHandler::handle`] when the response is malformed or the
    /// connection fails. The default only logs.
    fn on_error(self: Box<Self>, error: FetchError) {
        warn!(cause = %error, "fetch failed");
    }
}

/// A [`ResponseHandler`] built from a closure; see [`response_fn`].
pub struct ResponseFn<F> {
    f: F,
}

/// Wraps `f` so it can be passed where a [`ResponseHandler`] is expected.
///
/// ```
/// use reactor_http::client::response_fn;
///
/// let handler = response_fn(|response| println!("{}", response.status()));
/// # let _ = handler;
/// ```
pub fn response_fn<F>(f: F) -> ResponseFn<F>
where
    F: FnOnce(Response),
{
    ResponseFn { f }
}

impl<F> ResponseHandler for ResponseFn<F>
where
    F: FnOnce(Response),
{
    fn handle(self: Box<Self>, response: Response) {
        (self.f)(response);
    }
}

impl<F> fmt::Debug for ResponseFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFn").finish_non_exhaustive()
    }
}
