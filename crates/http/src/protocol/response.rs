use bytes::Bytes;
use http::StatusCode;

use crate::protocol::status;

/// An HTTP/1.0 response: a status code and a body, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    /// A response with an empty body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Bytes::new())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// The reason phrase this response is sent with; unknown codes report the 500 phrase.
    pub fn reason(&self) -> &'static str {
        status::normalize(self.status).1
    }
}
