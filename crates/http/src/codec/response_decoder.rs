//! HTTP response decoder used by the client.
//!
//! Responses must carry `Content-Length`: there is no chunked or close-delimited
//! framing. The client only decodes once the server has closed the connection, through
//! [`Decoder::decode_eof`], so a close that cuts the body short is reported as
//! [`ParseError::IncompleteMessage`] instead of being mistaken for a shorter body.

use bytes::{Buf, BytesMut};
use http::StatusCode;
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::{self, MAX_HEADER_BYTES, MAX_HEADER_NUM};
use crate::ensure;
use crate::protocol::{ParseError, Response, status};

#[derive(Debug, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the one response a closed connection left behind.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::IncompleteMessage`] if the bytes stop short of a full response.
    pub fn finish(&mut self, buf: &mut BytesMut) -> Result<Response, ParseError> {
        self.decode(buf)?.ok_or_else(|| ParseError::incomplete_message(buf.len()))
    }
}

impl Decoder for ResponseDecoder {
    type Item = Response;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut resp = httparse::Response::new(&mut headers);

        let header_size = match resp.parse(&src[..]).map_err(header::parse_error)? {
            Status::Complete(header_size) => header_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };
        ensure!(header_size <= MAX_HEADER_BYTES, ParseError::too_large_header(header_size, MAX_HEADER_BYTES));

        let code = resp.code.ok_or_else(|| ParseError::invalid_status("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(ParseError::invalid_status)?;
        ensure!(
            status::reason_phrase(status).is_some(),
            ParseError::invalid_status(format!("unregistered status code {code}")),
            code,
            "rejecting response status"
        );

        let body_size = header::content_length(resp.headers)?.ok_or(ParseError::MissingContentLength)?;

        let frame_size = header_size
            .checked_add(body_size)
            .ok_or_else(|| ParseError::invalid_content_length(format!("value {body_size} is too large")))?;
        if src.len() < frame_size {
            trace!(received = src.len() - header_size, expected = body_size, "response body not complete yet");
            return Ok(None);
        }

        src.advance(header_size);
        let body = src.split_to(body_size).freeze();
        Ok(Some(Response::new(status, body)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.finish(buf).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn complete_response() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\nContent-Length: 1\r\n\r\nA"[..]);
        let response = ResponseDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"A");
        assert!(buf.is_empty());
    }

    #[test]
    fn extra_headers_are_skipped() {
        let raw = indoc! {r"
        HTTP/1.1 404 Not Found
        Server: test
        content-length: 9
        Connection: close

        not here!"}
        .replace('\n', "\r\n");
        let mut buf = BytesMut::from(raw.as_str());

        let response = ResponseDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(&response.body()[..], b"not here!");
    }

    #[test]
    fn partial_body_is_incomplete() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nab"[..]);
        assert!(ResponseDecoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn close_mid_body_is_an_error() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nab"[..]);
        let result = ResponseDecoder.decode_eof(&mut buf);
        assert!(matches!(result, Err(ParseError::IncompleteMessage { received: 40 })));
    }

    #[test]
    fn finish_returns_the_complete_response() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 201 Created\r\nContent-Length: 2\r\n\r\nok"[..]);
        let response = ResponseDecoder::new().finish(&mut buf).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(&response.body()[..], b"ok");

        let mut buf = BytesMut::from(&b"HTTP/1.0 201 Created\r\n"[..]);
        assert!(matches!(ResponseDecoder::new().finish(&mut buf), Err(ParseError::IncompleteMessage { received: 22 })));
    }

    #[test]
    fn close_without_any_bytes_is_an_error() {
        let mut buf = BytesMut::new();
        assert!(matches!(ResponseDecoder.decode_eof(&mut buf), Err(ParseError::IncompleteMessage { received: 0 })));
    }

    #[test]
    fn content_length_is_required() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\nbody"[..]);
        assert!(matches!(ResponseDecoder.decode(&mut buf), Err(ParseError::MissingContentLength)));
    }

    #[test]
    fn content_length_overflowing_the_frame_is_rejected() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\nContent-Length: 18446744073709551615\r\n\r\n"[..]);
        assert!(matches!(ResponseDecoder.decode_eof(&mut buf), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn unregistered_status_is_rejected() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 418 I'm a teapot\r\nContent-Length: 0\r\n\r\n"[..]);
        assert!(matches!(ResponseDecoder.decode(&mut buf), Err(ParseError::InvalidStatus { .. })));
    }

    #[test]
    fn garbage_status_line_is_rejected() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 abc OK\r\nContent-Length: 0\r\n\r\n"[..]);
        assert!(ResponseDecoder.decode(&mut buf).is_err());

        let mut buf = BytesMut::from(&b"hello world\r\n\r\n"[..]);
        assert!(ResponseDecoder.decode(&mut buf).is_err());
    }
}
