use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::{ParseError, SendError};

/// Why a fetch did not produce a response.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("{host}:{port} resolved to no address")]
    NoAddress { host: String, port: u16 },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to register connection: {source}")]
    Register {
        #[source]
        source: io::Error,
    },

    #[error("failed to send request: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("invalid response: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },
}
