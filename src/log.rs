//! Logging support, generic over `tracing` being enabled or not.

#[cfg(feature = "tracing")]
pub(crate) use tracing::debug;
#[cfg(feature = "tracing")]
pub(crate) use tracing::warn;

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($args:tt)*) => {{
        if false {
            let _ = format_args!($($args)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_warn {
    ($($args:tt)*) => {{
        if false {
            let _ = format_args!($($args)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {debug, log_warn as warn};
