//! HTTP request value and its one-shot reply slot.
//!
//! A [`Request`] is produced by the [`RequestDecoder`](crate::codec::RequestDecoder) once a
//! complete frame has been buffered. On the server side it also carries the
//! connection it arrived on and the reply the handler chose for it.

use std::os::fd::RawFd;

use bytes::Bytes;
use http::{Method, StatusCode};

use crate::protocol::Response;

/// A parsed HTTP/1.0 request.
///
/// The reply slot can be filled exactly once through [`Request::reply`]. Replying a
/// second time is a defect in the calling handler and panics.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    body: Bytes,
    connection: Option<RawFd>,
    replied: bool,
    reply: Option<Response>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { method, path: path.into(), body: body.into(), connection: None, replied: false, reply: None }
    }

    /// Binds the request to the connection it was read from.
    #[must_use]
    pub fn with_connection(mut self, fd: RawFd) -> Self {
        self.connection = Some(fd);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The connection this request arrived on, if it was read by a server.
    pub fn connection(&self) -> Option<RawFd> {
        self.connection
    }

    pub fn is_replied(&self) -> bool {
        self.replied
    }

    /// Records the response for this request.
    ///
    /// # Panics
    ///
    /// Panics if the request has already been replied to.
    pub fn reply(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        assert!(!self.replied, "reply to request {} {} is already done", self.method, self.path);
        self.replied = true;
        self.reply = Some(Response::new(status, body));
    }

    /// Takes the recorded response out of the request.
    ///
    /// The request stays marked as replied, so a later [`Request::reply`] still panics.
    pub fn take_reply(&mut self) -> Option<Response> {
        self.reply.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_recorded_once() {
        let mut request = Request::new(Method::GET, "/a/10", "");
        assert!(!request.is_replied());

        request.reply(StatusCode::OK, "A");

        assert!(request.is_replied());
        let response = request.take_reply().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"A");
        assert!(request.take_reply().is_none());
        assert!(request.is_replied());
    }

    #[test]
    #[should_panic(expected = "already done")]
    fn second_reply_panics() {
        let mut request = Request::new(Method::POST, "/b/10", "bbb");
        request.reply(StatusCode::OK, "B");
        request.reply(StatusCode::OK, "B");
    }

    #[test]
    #[should_panic(expected = "already done")]
    fn reply_after_take_still_panics() {
        let mut request = Request::new(Method::GET, "/", "");
        request.reply(StatusCode::OK, "");
        let _ = request.take_reply();
        request.reply(StatusCode::OK, "");
    }

    #[test]
    fn connection_is_attached() {
        let request = Request::new(Method::GET, "/", "").with_connection(7);
        assert_eq!(request.connection(), Some(7));
        assert_eq!(Request::new(Method::GET, "/", "").connection(), None);
    }
}
