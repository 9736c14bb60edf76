use std::fmt;

use bytes::Bytes;
use http::StatusCode;
use reactor_http::protocol::Request;

/// Serves the requests routed to it.
///
/// `args` holds the substrings captured by the route's pattern. A handler must call
/// [`Request::reply`] exactly once; if it returns without replying the server answers
/// `500 Internal Server Error`, and replying twice panics. Methods a handler does not
/// override answer `405 Method Not Allowed`.
pub trait RequestHandler {
    fn get(&self, request: &mut Request, args: &[String]) {
        let _ = args;
        method_not_allowed(request);
    }

    fn post(&self, request: &mut Request, args: &[String]) {
        let _ = args;
        method_not_allowed(request);
    }
}

fn method_not_allowed(request: &mut Request) {
    request.reply(StatusCode::METHOD_NOT_ALLOWED, Bytes::new());
}

type HandlerFn = Box<dyn Fn(&mut Request, &[String])>;

/// a [`RequestHandler`] assembled from closures, one per method
#[derive(Default)]
pub struct FnHandler {
    get: Option<HandlerFn>,
    post: Option<HandlerFn>,
}

impl FnHandler {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Request, &[String]) + 'static,
    {
        self.get = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_post<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Request, &[String]) + 'static,
    {
        self.post = Some(Box::new(f));
        self
    }
}

impl RequestHandler for FnHandler {
    fn get(&self, request: &mut Request, args: &[String]) {
        match &self.get {
            Some(f) => f(request, args),
            None => method_not_allowed(request),
        }
    }

    fn post(&self, request: &mut Request, args: &[String]) {
        match &self.post {
            Some(f) => f(request, args),
            None => method_not_allowed(request),
        }
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("get", &self.get.is_some()).field("post", &self.post.is_some()).finish()
    }
}

macro_rules! method_handler_fn {
    ($method:ident, $setter:ident, $name:literal) => {
        #[doc = concat!("A [`FnHandler`] serving `", $name, "` through `f`; other methods get 405.")]
        pub fn $method<F>(f: F) -> FnHandler
        where
            F: Fn(&mut Request, &[String]) + 'static,
        {
            FnHandler::new().$setter(f)
        }
    };
}

method_handler_fn!(get_fn, on_get, "GET");
method_handler_fn!(post_fn, on_post, "POST");
