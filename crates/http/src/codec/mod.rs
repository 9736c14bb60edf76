//! HTTP/1.0 wire codec
//!
//! Pure byte-level framing, with no socket access. The decoders implement
//! [`tokio_util::codec::Decoder`] so the result distinguishes the two ways a parse can
//! fall short:
//!
//! - `Ok(None)`: incomplete, keep buffering
//! - `Err(ParseError)`: malformed, fail the connection
//!
//! # Components
//!
//! - [`RequestDecoder`] / [`ResponseEncoder`]: the server side
//! - [`RequestEncoder`] / [`ResponseDecoder`]: the client side
//! - [`parse_request`], [`parse_response`], [`serialize_request`], [`serialize_response`]:
//!   the same operations over plain byte slices
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use reactor_http::codec::{parse_request, serialize_request, serialize_response};
//!
//! let wire = serialize_request(&Method::POST, "/b/10", b"bbb");
//! let request = parse_request(&wire).unwrap().unwrap();
//! assert_eq!(request.path(), "/b/10");
//!
//! let wire = serialize_response(StatusCode::OK, b"B");
//! assert_eq!(&wire[..], b"HTTP/1.0 200 OK\r\nContent-Length: 1\r\n\r\nB");
//! ```

mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;

use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode};
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, Request, Response};

/// Parses one request from the front of `bytes`.
///
/// Returns `Ok(None)` while the header block or the announced body is incomplete.
pub fn parse_request(bytes: &[u8]) -> Result<Option<Request>, ParseError> {
    RequestDecoder.decode(&mut BytesMut::from(bytes))
}

/// Parses one response from the front of `bytes`; `Content-Length` is mandatory.
pub fn parse_response(bytes: &[u8]) -> Result<Option<Response>, ParseError> {
    ResponseDecoder.decode(&mut BytesMut::from(bytes))
}

pub fn serialize_request(method: &Method, path: &str, body: &[u8]) -> Bytes {
    let request = Request::new(method.clone(), path, Bytes::copy_from_slice(body));
    let mut dst = BytesMut::new();
    request_encoder::encode_request(&request, &mut dst);
    dst.freeze()
}

pub fn serialize_response(status: StatusCode, body: &[u8]) -> Bytes {
    let response = Response::new(status, Bytes::copy_from_slice(body));
    let mut dst = BytesMut::new();
    response_encoder::encode_response(&response, &mut dst);
    dst.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::status;

    #[test]
    fn request_round_trip() {
        let cases: [(Method, &str, &[u8]); 5] = [
            (Method::GET, "/", b""),
            (Method::GET, "/a/10", b"aaa"),
            (Method::POST, "/b/10", b"abcxyz"),
            (Method::POST, "/upload?name=x", &[0u8, 1, 2, 255, b'\r', b'\n', b'\r', b'\n']),
            (Method::PUT, "/c", b"put body"),
        ];

        for (method, path, body) in cases {
            let wire = serialize_request(&method, path, body);
            let request = parse_request(&wire).unwrap().unwrap();
            assert_eq!(request.method(), &method);
            assert_eq!(request.path(), path);
            assert_eq!(&request.body()[..], body);
        }
    }

    #[test]
    fn response_round_trip_over_the_table() {
        let body = b"payload \r\n\r\n with separators";
        for code in 100..=599 {
            let status = StatusCode::from_u16(code).unwrap();
            if status::reason_phrase(status).is_none() {
                continue;
            }

            let wire = serialize_response(status, body);
            let response = parse_response(&wire).unwrap().unwrap();
            assert_eq!(response.status(), status);
            assert_eq!(&response.body()[..], body);
        }
    }

    #[test]
    fn truncated_frames_are_incomplete() {
        let wire = serialize_request(&Method::POST, "/b/10", b"bbb");
        for end in 0..wire.len() {
            assert!(parse_request(&wire[..end]).unwrap().is_none(), "prefix of {end} bytes parsed");
        }

        let wire = serialize_response(StatusCode::OK, b"B");
        for end in 0..wire.len() {
            assert!(parse_response(&wire[..end]).unwrap().is_none(), "prefix of {end} bytes parsed");
        }
    }
}
