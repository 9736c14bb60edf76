use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::codec::header::{self, INIT_HEADER_SIZE};
use crate::protocol::{Response, SendError, status};

/// Serializes a [`Response`] as `HTTP/1.0 <code> <reason>`, a `Content-Length` header and the body.
///
/// Status codes outside the reason-phrase table are sent as `500 Internal Server Error`.
#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_response(&item, dst);
        Ok(())
    }
}

pub(crate) fn encode_response(response: &Response, dst: &mut BytesMut) {
    let (status, reason) = status::normalize(response.status());
    if status != response.status() {
        warn!(status = response.status().as_u16(), "unregistered status code, sending 500 instead");
    }

    let body = response.body();
    dst.reserve(INIT_HEADER_SIZE + body.len());
    dst.put_slice(b"HTTP/1.0 ");
    dst.put_slice(status.as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(reason.as_bytes());
    dst.put_slice(b"\r\n");
    header::put_content_length(dst, body.len());
    dst.put_slice(body);
}
