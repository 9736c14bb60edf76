//! Utility macros shared by the codec modules.

/// Returns early with `$error` if `$predicate` does not hold.
///
/// Extra arguments are forwarded to `tracing::debug!` before returning, so a rejected
/// frame can say what was wrong with it.
///
/// ```text
/// ensure!(header_size <= MAX_HEADER_BYTES, ParseError::too_large_header(header_size, MAX_HEADER_BYTES));
/// ensure!(known, ParseError::invalid_status("unregistered"), code, "rejecting response status");
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
    ($predicate:expr, $error:expr, $($field:tt)+) => {
        if !$predicate {
            tracing::debug!($($field)+);
            return Err($error);
        }
    };
}

pub(crate) use ensure;
