use serde::{Deserialize, Deserializer};

use crate::{
    behavior::{Behavior, BehaviorKind, Weight},
    config::EngineConfig,
    delay::DelaySpec,
    status,
};

/// Raw simulation parameters of a single request.
///
/// All values are kept as received: parsing happens leniently
/// in [`simulate`], where malformed values fall back to their default.
/// Of a repeated key only the first value counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationParams {
    #[serde(default, deserialize_with = "first_value")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub delay: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub load: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub allocation: Option<String>,
}

impl SimulationParams {
    /// Extract the parameters from a uri query.
    ///
    /// An undecodable query results in no parameters.
    pub fn from_query(query: Option<&str>) -> Self {
        from_query_lenient(query)
    }
}

/// Parameters of the shutdown (poison pill) request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShutdownParams {
    #[serde(default, deserialize_with = "first_value")]
    pub delay: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub exit: Option<String>,
}

impl ShutdownParams {
    pub fn from_query(query: Option<&str>) -> Self {
        from_query_lenient(query)
    }
}

fn first_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Vec::<String>::deserialize(deserializer)?.into_iter().next())
}

fn from_query_lenient<T: for<'de> Deserialize<'de> + Default>(query: Option<&str>) -> T {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return T::default();
    };
    serde_html_form::from_str(query).unwrap_or_else(|err| {
        rama::telemetry::tracing::debug!("ignore undecodable query '{query}': {err}");
        T::default()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub behavior: Behavior,
    pub status: u16,
}

impl Outcome {
    #[inline(always)]
    pub fn behavior_kind(&self) -> BehaviorKind {
        self.behavior.kind()
    }
}

/// Select and execute the behavior for a request, then resolve its status.
///
/// A `delay` parameter, when present, replaces the configured default,
/// even if it turns out to be malformed.
pub async fn simulate(cfg: &EngineConfig, params: &SimulationParams) -> Outcome {
    let delay = match params.delay.as_deref() {
        Some(raw) => DelaySpec::parse(Some(raw)),
        None => cfg.request_delay,
    };

    let behavior = Behavior::select(
        &delay,
        Weight::parse(params.load.as_deref()),
        Weight::parse(params.allocation.as_deref()),
    );
    behavior.execute(cfg.cpu_load_units()).await;

    let status = status::resolve(params.status.as_deref(), cfg.server_error_rate);
    Outcome { behavior, status }
}
