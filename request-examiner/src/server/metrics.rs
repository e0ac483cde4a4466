use std::{sync::OnceLock, time::Duration};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rama::{http::StatusCode, telemetry::tracing};
use request_examiner_lib::behavior::BehaviorKind;

use super::routes::Route;

const REQUESTS: &str = "examiner_requests_total";
const RESPONSES: &str = "examiner_responses_total";
const BEHAVIORS: &str = "examiner_behaviors_total";
const REQUEST_DURATION: &str = "examiner_request_duration_seconds";

// a recorder can only be installed once per process,
// all servers within the process share it
static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Recorder-backed metrics, rendered in the Prometheus text format.
#[derive(Clone)]
pub(super) struct Metrics {
    handle: PrometheusHandle,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub(super) fn install() -> Self {
        let handle = PROM_HANDLE.get_or_init(|| {
            tracing::info!("initializing prometheus metrics");
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(err) = ::metrics::set_boxed_recorder(Box::new(recorder)) {
                tracing::warn!("failed to install prometheus recorder: {err}");
            }

            ::metrics::describe_counter!(REQUESTS, "Requests received per route.");
            ::metrics::describe_counter!(RESPONSES, "Responses sent per status class.");
            ::metrics::describe_counter!(BEHAVIORS, "Simulated behaviors per kind.");
            ::metrics::describe_histogram!(
                REQUEST_DURATION,
                ::metrics::Unit::Seconds,
                "Time spent serving a request per route."
            );

            handle
        });

        Self {
            handle: handle.clone(),
        }
    }

    pub(super) fn record_request(&self, route: Route) {
        ::metrics::increment_counter!(REQUESTS, "route" => route.as_str());
    }

    pub(super) fn record_response(&self, route: Route, status: StatusCode, elapsed: Duration) {
        if let Some(class) = status_class(status) {
            ::metrics::increment_counter!(RESPONSES, "class" => class);
        }
        ::metrics::histogram!(REQUEST_DURATION, elapsed, "route" => route.as_str());
    }

    pub(super) fn record_behavior(&self, kind: BehaviorKind) {
        ::metrics::increment_counter!(BEHAVIORS, "kind" => kind.as_str());
    }

    pub(super) fn render(&self) -> String {
        self.handle.render()
    }
}

fn status_class(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() / 100 {
        1 => Some("1xx"),
        2 => Some("2xx"),
        3 => Some("3xx"),
        4 => Some("4xx"),
        5 => Some("5xx"),
        _ => None,
    }
}

/// Value of the sample line starting with `series`, if any.
#[cfg(test)]
pub(super) fn sample_value(rendered: &str, series: &str) -> Option<f64> {
    rendered.lines().find_map(|line| {
        line.strip_prefix(series)
            .and_then(|rest| rest.strip_prefix(' '))
            .and_then(|value| value.trim().parse().ok())
    })
}
