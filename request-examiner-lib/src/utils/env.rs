use std::{num::NonZeroUsize, sync::LazyLock};

pub const fn project_name() -> &'static str {
    "request-examiner"
}

pub const fn server_identifier() -> &'static str {
    concat!("request-examiner/", env!("CARGO_PKG_VERSION"))
}

/// Amount of parallelism available to the process, at least one.
pub fn available_parallelism() -> NonZeroUsize {
    static PARALLELISM: LazyLock<NonZeroUsize> =
        LazyLock::new(|| std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN));
    *PARALLELISM
}
