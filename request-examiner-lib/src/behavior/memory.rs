use std::time::{Duration, Instant};

use rama::telemetry::tracing;
use uuid::Uuid;

use super::{Throttle, Weight};

/// Keep growing a single buffer with unique tokens until `duration` has passed.
///
/// The buffer grows on the blocking pool, held until the deadline
/// and released on return. Returns the number of bytes that were allocated.
pub(super) async fn allocate(duration: Duration, weight: Weight) -> usize {
    let deadline = Instant::now() + duration;

    let allocated = match tokio::task::spawn_blocking(move || fill(deadline, weight)).await {
        Ok(allocated) => allocated,
        Err(err) => {
            tracing::debug!("memory allocation unit failed: {err}");
            0
        }
    };

    tracing::debug!(allocated, %weight, "memory allocated for {duration:?}: release");
    allocated
}

fn fill(deadline: Instant, weight: Weight) -> usize {
    let mut throttle = Throttle::new(weight);
    let mut buffer = String::new();
    let mut token = Uuid::encode_buffer();

    while Instant::now() < deadline {
        if throttle.tick() {
            std::thread::sleep(Throttle::PAUSE);
        }
        buffer.push_str(Uuid::new_v4().hyphenated().encode_lower(&mut token));
    }

    buffer.len()
}
