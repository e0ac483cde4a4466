use std::{convert::Infallible, fmt, str::FromStr, time::Duration};

/// Parsed `delay` parameter.
///
/// Accepted syntax (after trimming):
///
/// - `<ms>`: a fixed delay, e.g. `250`;
/// - `<min>..<max>`: a random delay within `[min, max]` (inclusive),
///   where any run of one or more dots separates both bounds, e.g. `100.500` or `100...500`.
///
/// Anything else, including a reversed range, is no delay at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelaySpec {
    #[default]
    None,
    Fixed(u64),
    Range {
        min: u64,
        max: u64,
    },
}

impl DelaySpec {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::None;
        };

        if let Some(ms) = parse_digits(raw) {
            return Self::Fixed(ms);
        }

        let Some((lo, rest)) = raw.split_once('.') else {
            return Self::None;
        };
        let hi = rest.trim_start_matches('.');

        match (parse_digits(lo), parse_digits(hi)) {
            (Some(min), Some(max)) if min <= max => Self::Range { min, max },
            _ => Self::None,
        }
    }

    #[inline(always)]
    pub fn is_delayed(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Resolve the delay in milliseconds, `None` if not delayed.
    ///
    /// Each call on a range draws a new value.
    pub fn resolved_ms(&self) -> Option<u64> {
        self.resolved_ms_with(&mut rand::rng())
    }

    pub fn resolved_ms_with<R: rand::RngExt + ?Sized>(&self, rng: &mut R) -> Option<u64> {
        match *self {
            Self::None => None,
            Self::Fixed(ms) => Some(ms),
            Self::Range { min, max } => Some(rng.random_range(min..=max)),
        }
    }

    #[inline(always)]
    pub fn resolve(&self) -> Option<Duration> {
        self.resolved_ms().map(Duration::from_millis)
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // overflowing values are treated as malformed
    s.parse().ok()
}

impl FromStr for DelaySpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(Some(s)))
    }
}

impl fmt::Display for DelaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Fixed(ms) => write!(f, "{ms}"),
            Self::Range { min, max } => write!(f, "{min}..{max}"),
        }
    }
}
