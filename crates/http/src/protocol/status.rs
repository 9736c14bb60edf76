//! Reason phrases for the status codes this server is willing to emit.
//!
//! The table is closed: a status code that is not listed here is
//! rewritten to `500 Internal Server Error` on the way out and rejected on the
//! way in.

use http::StatusCode;

/// Returns the reason phrase registered for `status`, or `None` if the code is
/// not part of the table.
pub fn reason_phrase(status: StatusCode) -> Option<&'static str> {
    let reason = match status.as_u16() {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(reason)
}

/// Maps `status` onto the table, replacing unknown codes with 500.
pub fn normalize(status: StatusCode) -> (StatusCode, &'static str) {
    match reason_phrase(status) {
        Some(reason) => (status, reason),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    }
}
