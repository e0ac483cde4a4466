use std::num::NonZeroUsize;

use crate::{delay::DelaySpec, status::ErrorRate, utils};

/// Process-wide simulation settings.
///
/// Created once at startup and shared read-only
/// (e.g. behind an `Arc`) with all request handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Body returned by the examine endpoints.
    pub echo_value: String,
    /// Delay applied to requests that do not define one.
    pub request_delay: DelaySpec,
    /// Server error rate applied to requests without explicit status.
    pub server_error_rate: ErrorRate,
    /// Cpu load units in flight per cpu load behavior,
    /// the available parallelism if not defined.
    pub max_cpu_load_units: Option<NonZeroUsize>,
}

impl EngineConfig {
    /// Echo value as returned to clients (trimmed).
    #[inline(always)]
    pub fn echo_body(&self) -> &str {
        self.echo_value.trim()
    }

    pub fn cpu_load_units(&self) -> NonZeroUsize {
        self.max_cpu_load_units.unwrap_or_else(utils::env::available_parallelism)
    }
}
