//! Internal helper macros.

/// Returns early with `$error` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(!name.is_empty(), InvalidHeaderValue::new("header name can not be empty"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
