use std::hint::black_box;
use std::io::{self, Read, Write};

use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use http::{Method, StatusCode};
use reactor_http::codec::{RequestDecoder, RequestEncoder, ResponseDecoder, ResponseEncoder};
use reactor_http::connection::ConnectionBuffers;
use reactor_http::protocol::{Request, Response};
use tokio_util::codec::{Decoder, Encoder};

// Mock IO for testing
struct MockIO {
    read_data: Vec<u8>,
    read_pos: usize,
    write_data: Vec<u8>,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, read_pos: 0, write_data: Vec::new() }
    }
}

impl Read for MockIO {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.read_data[self.read_pos..];
        if remaining.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let amt = remaining.len().min(buf.len());
        buf[..amt].copy_from_slice(&remaining[..amt]);
        self.read_pos += amt;
        Ok(amt)
    }
}

impl Write for MockIO {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn bench_request_decoder(c: &mut Criterion) {
    let request = b"POST /b/10 HTTP/1.0\r\nHost: localhost\r\nContent-Length: 3\r\n\r\nbbb";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::from(&request[..]);
            black_box(RequestDecoder::new().decode(&mut bytes).unwrap());
        });
    });
}

fn bench_response_decoder(c: &mut Criterion) {
    let response = b"HTTP/1.0 200 OK\r\nContent-Length: 12\r\n\r\nHello World!";

    c.bench_function("decode_simple_response", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::from(&response[..]);
            black_box(ResponseDecoder::new().decode_eof(&mut bytes).unwrap());
        });
    });
}

fn bench_encoders(c: &mut Criterion) {
    c.bench_function("encode_simple_request", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::new();
            RequestEncoder::new().encode(Request::new(Method::GET, "/a/10", "aaa"), &mut bytes).unwrap();
            black_box(bytes);
        });
    });

    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::new();
            ResponseEncoder::new().encode(Response::new(StatusCode::OK, "Hello World!"), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_buffers(c: &mut Criterion) {
    let payload = vec![b'x'; 64 * 1024];

    c.bench_function("drain_and_flush_64k", |b| {
        b.iter(|| {
            let mut io = MockIO::new(payload.clone());
            let mut buffers = ConnectionBuffers::new();
            buffers.drain_from(&mut io).unwrap();
            let received = buffers.read_buf().clone();
            buffers.write_buf_mut().extend_from_slice(&received);
            black_box(buffers.flush_to(&mut io).unwrap());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_decoder, bench_encoders, bench_buffers);
criterion_main!(benches);
