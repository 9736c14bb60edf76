//! Helpers shared by the request and response decoders.
//!
//! Header blocks are scanned with `httparse`. The only header that carries meaning for
//! HTTP/1.0 framing here is `Content-Length`; everything else is skipped over.

use bytes::{BufMut, BytesMut};
use httparse::Error;

use crate::protocol::ParseError;

/// Maximum number of headers allowed in a message
pub(crate) const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the request/status line plus all headers
pub(crate) const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Initial buffer size reserved for a serialized head
pub(crate) const INIT_HEADER_SIZE: usize = 128;

pub(crate) fn parse_error(e: Error) -> ParseError {
    match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e.to_string()),
    }
}

/// Looks up `Content-Length` (case-insensitively) and parses its value.
pub(crate) fn content_length(headers: &[httparse::Header<'_>]) -> Result<Option<usize>, ParseError> {
    let Some(header) = headers.iter().find(|header| header.name.eq_ignore_ascii_case("content-length")) else {
        return Ok(None);
    };

    let value = std::str::from_utf8(header.value).map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ParseError::invalid_content_length(format!("value {value} is not usize")))
}

/// Writes the `Content-Length` line and the blank line that ends the head.
pub(crate) fn put_content_length(dst: &mut BytesMut, length: usize) {
    dst.put_slice(b"Content-Length: ");
    dst.put_slice(length.to_string().as_bytes());
    dst.put_slice(b"\r\n\r\n");
}
