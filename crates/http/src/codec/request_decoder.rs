//! HTTP request decoder module
//!
//! Turns the bytes accumulated on a server connection into a complete [`Request`].
//! The decoder never touches a socket: it only inspects the buffer it is handed and
//! consumes one frame from its front once the frame is complete.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use reactor_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /a/10 HTTP/1.0\r\nContent-Len"[..]);
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! buffer.extend_from_slice(b"gth: 0\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/a/10");
//! ```

use bytes::{Buf, BytesMut};
use http::Method;
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::{self, MAX_HEADER_BYTES, MAX_HEADER_NUM};
use crate::ensure;
use crate::protocol::{ParseError, Request};

/// A decoder for HTTP/1.0 requests framed by `Content-Length`.
///
/// - `Ok(None)`: the header block or the body has not fully arrived yet
/// - `Ok(Some(request))`: a complete request, its bytes removed from the buffer
/// - `Err(_)`: the bytes can never form a valid request
///
/// A request without `Content-Length` has an empty body.
#[derive(Debug, Default)]
pub struct RequestDecoder;

impl RequestDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let header_size = match req.parse(&src[..]).map_err(header::parse_error)? {
            Status::Complete(header_size) => header_size,
            Status::Partial => {
                ensure!(
                    src.len() <= MAX_HEADER_BYTES,
                    ParseError::too_large_header(src.len(), MAX_HEADER_BYTES),
                    buffered = src.len(),
                    "request head exceeds the limit before completing"
                );
                return Ok(None);
            }
        };
        ensure!(header_size <= MAX_HEADER_BYTES, ParseError::too_large_header(header_size, MAX_HEADER_BYTES));

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let path = req.path.ok_or(ParseError::InvalidUri)?.to_owned();
        let body_size = header::content_length(req.headers)?.unwrap_or(0);

        let frame_size = header_size
            .checked_add(body_size)
            .ok_or_else(|| ParseError::invalid_content_length(format!("value {body_size} is too large")))?;
        if src.len() < frame_size {
            trace!(received = src.len() - header_size, expected = body_size, "request body not complete yet");
            return Ok(None);
        }

        src.advance(header_size);
        let body = src.split_to(body_size).freeze();
        Ok(Some(Request::new(method, path, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(str: &str) -> BytesMut {
        BytesMut::from(str.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn from_curl() {
        let mut buf = crlf(indoc! {r"
        GET /a/10 HTTP/1.1
        Host: 127.0.0.1:8850
        User-Agent: curl/7.79.1
        Accept: */*

        "});

        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/a/10");
        assert!(request.body().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn post_with_body() {
        let mut buf = crlf(indoc! {r"
        POST /b/10 HTTP/1.0
        Content-Type: application/x-www-form-urlencoded
        Content-Length: 6

        abcxyz"});

        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/b/10");
        assert_eq!(&request.body()[..], b"abcxyz");
    }

    #[test]
    fn waits_for_the_separator() {
        let mut buf = BytesMut::from(&b"GET / HTTP/1.0\r\nHost: x\r\n"[..]);
        assert!(RequestDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 25);
    }

    #[test]
    fn waits_for_the_body() {
        let mut buf = BytesMut::from(&b"POST /b HTTP/1.0\r\nContent-Length: 6\r\n\r\nabc"[..]);
        assert!(RequestDecoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"xyz");
        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&request.body()[..], b"abcxyz");
    }

    #[test]
    fn one_byte_at_a_time() {
        let wire = b"POST /b/10 HTTP/1.0\r\nContent-Length: 3\r\n\r\nbbb";
        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::new();

        let mut decoded = None;
        for (i, byte) in wire.iter().enumerate() {
            buf.extend_from_slice(&[*byte]);
            match decoder.decode(&mut buf).unwrap() {
                Some(request) => {
                    assert_eq!(i, wire.len() - 1, "decoded before the last byte");
                    decoded = Some(request);
                }
                None => assert!(i < wire.len() - 1),
            }
        }

        let request = decoded.unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/b/10");
        assert_eq!(&request.body()[..], b"bbb");
    }

    #[test]
    fn other_methods_are_parsed() {
        let mut buf = BytesMut::from(&b"DELETE /a/10 HTTP/1.0\r\n\r\n"[..]);
        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.method(), &Method::DELETE);

        let mut buf = BytesMut::from(&b"PURGE /cache HTTP/1.0\r\n\r\n"[..]);
        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.method().as_str(), "PURGE");
    }

    #[test]
    fn trailing_bytes_stay_in_the_buffer() {
        let mut buf = BytesMut::from(&b"GET /x HTTP/1.0\r\nContent-Length: 1\r\n\r\nAextra"[..]);
        let request = RequestDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&request.body()[..], b"A");
        assert_eq!(&buf[..], b"extra");
    }

    #[test]
    fn malformed_request_line() {
        let mut buf = BytesMut::from(&b"GET\r\n\r\n"[..]);
        assert!(RequestDecoder.decode(&mut buf).is_err());

        let mut buf = BytesMut::from(&b"GET / FTP/1.0\r\n\r\n"[..]);
        assert!(RequestDecoder.decode(&mut buf).is_err());
    }

    #[test]
    fn malformed_content_length() {
        let mut buf = BytesMut::from(&b"POST / HTTP/1.0\r\nContent-Length: many\r\n\r\n"[..]);
        assert!(matches!(RequestDecoder.decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn content_length_overflowing_the_frame_is_rejected() {
        let mut buf = BytesMut::from(&b"POST / HTTP/1.0\r\nContent-Length: 18446744073709551615\r\n\r\n"[..]);
        assert!(matches!(RequestDecoder.decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));

        let mut buf = BytesMut::from(&b"POST / HTTP/1.0\r\nContent-Length: 18446744073709551600\r\n\r\nab"[..]);
        assert!(matches!(RequestDecoder.decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn oversized_header_block() {
        let mut buf = BytesMut::from(&b"GET / HTTP/1.0\r\nX-Filler: "[..]);
        buf.extend_from_slice(&[b'a'; MAX_HEADER_BYTES]);
        assert!(matches!(RequestDecoder.decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }
}
