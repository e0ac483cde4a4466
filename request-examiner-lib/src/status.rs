use std::{fmt, str::FromStr};

pub const STATUS_OK: u16 = 200;
pub const STATUS_SERVER_ERROR: u16 = 500;

/// Explicit status overrides are only honoured within this range.
const EXPLICIT_STATUS_RANGE: std::ops::RangeInclusive<u16> = 200..=599;

/// Percentage (`0..=100`) of requests answered with a server error
/// when no explicit status was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ErrorRate(u8);

impl ErrorRate {
    pub const NONE: Self = Self(0);
    pub const ALWAYS: Self = Self(100);

    /// Create a new [`ErrorRate`], clamping `percent` to `0..=100`.
    pub fn new_clamped(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as u8)
    }

    #[inline(always)]
    pub fn percent(self) -> u8 {
        self.0
    }
}

impl FromStr for ErrorRate {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self::new_clamped)
    }
}

impl fmt::Display for ErrorRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Resolve the response status for a request.
///
/// A valid explicit status always wins, otherwise a server error
/// is injected with the configured `error_rate` probability.
pub fn resolve(explicit: Option<&str>, error_rate: ErrorRate) -> u16 {
    resolve_with(explicit, error_rate, &mut rand::rng())
}

pub fn resolve_with<R: rand::RngExt + ?Sized>(
    explicit: Option<&str>,
    error_rate: ErrorRate,
    rng: &mut R,
) -> u16 {
    if let Some(status) = parse_explicit(explicit) {
        return status;
    }

    let r: u8 = rng.random_range(0..100);
    if r < error_rate.percent() {
        STATUS_SERVER_ERROR
    } else {
        STATUS_OK
    }
}

fn parse_explicit(explicit: Option<&str>) -> Option<u16> {
    explicit?
        .trim()
        .parse()
        .ok()
        .filter(|status| EXPLICIT_STATUS_RANGE.contains(status))
}
