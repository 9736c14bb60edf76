use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::{self, INIT_HEADER_SIZE};
use crate::protocol::{Request, SendError};

/// Serializes a [`Request`] as `<METHOD> <PATH> HTTP/1.0`, a `Content-Length` header and the body.
#[derive(Debug, Default)]
pub struct RequestEncoder;

impl RequestEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Request> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_request(&item, dst);
        Ok(())
    }
}

pub(crate) fn encode_request(request: &Request, dst: &mut BytesMut) {
    let body = request.body();
    dst.reserve(INIT_HEADER_SIZE + request.path().len() + body.len());
    dst.put_slice(request.method().as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(request.path().as_bytes());
    dst.put_slice(b" HTTP/1.0\r\n");
    header::put_content_length(dst, body.len());
    dst.put_slice(body);
}
