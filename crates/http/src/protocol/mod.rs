//! HTTP/1.0 protocol values shared by the client and the server.
//!
//! - [`Request`]: method, path and body, plus the one-shot reply slot used on the server side
//! - [`Response`]: status code and body
//! - [`status`]: the closed table of reason phrases
//! - [`ParseError`] / [`SendError`]: codec errors

mod request;
pub use request::Request;

mod response;
pub use response::Response;

pub mod status;

mod error;
pub use error::ParseError;
pub use error::SendError;
