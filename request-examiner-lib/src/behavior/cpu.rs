use std::{
    hint::black_box,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use rama::telemetry::tracing;
use tokio::task::JoinSet;

use super::{Throttle, Weight};

/// Keep the cpu busy until `duration` has passed.
///
/// Units of busy work are launched on the blocking pool, at most
/// `max_units` at a time. All of them are bound to the same
/// deadline and joined before returning, so none outlive this call.
pub(super) async fn produce_load(duration: Duration, weight: Weight, max_units: NonZeroUsize) {
    let deadline = Instant::now() + duration;
    let max_units = max_units.get();

    let mut throttle = Throttle::new(weight);
    let mut units = JoinSet::new();
    let mut launched: u64 = 0;

    while Instant::now() < deadline {
        if throttle.tick() {
            tokio::time::sleep(Throttle::PAUSE).await;
        }

        while units.try_join_next().is_some() {}
        if units.len() >= max_units {
            let _ = units.join_next().await;
        }

        let iterations = weight.get();
        units.spawn_blocking(move || compute(iterations, deadline));
        launched += 1;

        tokio::task::consume_budget().await;
    }

    while let Some(result) = units.join_next().await {
        match result {
            Ok(runner) => tracing::trace!("cpu load unit finished: {runner}"),
            Err(err) => tracing::debug!("cpu load unit failed: {err}"),
        }
    }

    tracing::debug!(
        launched,
        %weight,
        max_units,
        "cpu load produced for {duration:?}"
    );
}

/// A single unit of busy work: `iterations` rounds of math,
/// cut short once the deadline has passed.
fn compute(iterations: u8, deadline: Instant) -> f64 {
    let mut runner = 0.0;
    for _ in 0..iterations {
        if Instant::now() >= deadline {
            break;
        }
        runner = black_box(rand::random::<f64>())
            .tan()
            .atan()
            .tan()
            .atan()
            .tan()
            .atan()
            .tan()
            .atan();
    }
    black_box(runner)
}
