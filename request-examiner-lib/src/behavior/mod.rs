use std::{fmt, num::NonZeroUsize, time::Duration};

use rama::telemetry::tracing;

use crate::delay::DelaySpec;

mod cpu;
mod memory;

/// Intensity of a load or allocation [`Behavior`], within `1..=100`.
///
/// A weight of 100 runs unthrottled, any lower weight inserts
/// a short pause after every `weight`-th unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Weight(u8);

impl Weight {
    pub const MAX: Self = Self(100);

    /// Parse a weight from a raw request parameter.
    ///
    /// Values that are absent, unparsable or `<= 0` are treated as no weight,
    /// values above 100 are clamped.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let value: i64 = raw?.trim().parse().ok()?;
        (value > 0).then(|| Self(value.min(100) as u8))
    }

    #[inline(always)]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline(always)]
    fn is_throttled(self) -> bool {
        self.0 < 100
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pauses the work loop of load and allocation behaviors
/// after every `weight`-th unit of work.
#[derive(Debug)]
struct Throttle {
    weight: Weight,
    units: u64,
}

impl Throttle {
    const PAUSE: Duration = Duration::from_millis(1);

    fn new(weight: Weight) -> Self {
        Self { weight, units: 0 }
    }

    /// Count one unit of work, returns true if a pause is due.
    fn tick(&mut self) -> bool {
        if !self.weight.is_throttled() {
            return false;
        }
        self.units += 1;
        self.units % u64::from(self.weight.get()) == 0
    }
}

/// Simulated work executed once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Wait(Duration),
    ProduceCpuLoad(Duration, Weight),
    AllocateMemory(Duration, Weight),
    NoOp,
}

impl Behavior {
    /// Select the behavior for a request.
    ///
    /// In order of precedence: cpu load, memory allocation, wait, no-op.
    /// Load and allocation weights require a delay to bound them,
    /// without a delay they are ignored.
    pub fn select(delay: &DelaySpec, load: Option<Weight>, allocation: Option<Weight>) -> Self {
        Self::select_with(delay, load, allocation, &mut rand::rng())
    }

    pub fn select_with<R: rand::RngExt + ?Sized>(
        delay: &DelaySpec,
        load: Option<Weight>,
        allocation: Option<Weight>,
        rng: &mut R,
    ) -> Self {
        let Some(duration) = delay.resolved_ms_with(rng).map(Duration::from_millis) else {
            return Self::NoOp;
        };

        match (load, allocation) {
            (Some(weight), _) => Self::ProduceCpuLoad(duration, weight),
            (None, Some(weight)) => Self::AllocateMemory(duration, weight),
            (None, None) => Self::Wait(duration),
        }
    }

    pub fn kind(&self) -> BehaviorKind {
        match self {
            Self::Wait(_) => BehaviorKind::Wait,
            Self::ProduceCpuLoad(..) => BehaviorKind::CpuLoad,
            Self::AllocateMemory(..) => BehaviorKind::MemoryAllocation,
            Self::NoOp => BehaviorKind::NoOp,
        }
    }

    pub fn duration(&self) -> Duration {
        match *self {
            Self::Wait(duration)
            | Self::ProduceCpuLoad(duration, _)
            | Self::AllocateMemory(duration, _) => duration,
            Self::NoOp => Duration::ZERO,
        }
    }

    /// Execute the behavior, returning once its duration has passed.
    ///
    /// A cpu load keeps at most `max_cpu_load_units` units of work in flight.
    pub async fn execute(self, max_cpu_load_units: NonZeroUsize) {
        tracing::debug!(behavior = ?self, "execute behavior");
        match self {
            Self::Wait(duration) => tokio::time::sleep(duration).await,
            Self::ProduceCpuLoad(duration, weight) => {
                cpu::produce_load(duration, weight, max_cpu_load_units).await
            }
            Self::AllocateMemory(duration, weight) => {
                memory::allocate(duration, weight).await;
            }
            Self::NoOp => (),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Wait,
    CpuLoad,
    MemoryAllocation,
    NoOp,
}

impl BehaviorKind {
    pub const ALL: [Self; 4] = [Self::Wait, Self::CpuLoad, Self::MemoryAllocation, Self::NoOp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::CpuLoad => "cpu_load",
            Self::MemoryAllocation => "memory_allocation",
            Self::NoOp => "noop",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
