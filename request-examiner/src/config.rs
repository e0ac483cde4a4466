use std::{num::NonZeroUsize, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rama::error::{BoxError, ErrorContext as _};
use regex::{Regex, RegexBuilder};

use request_examiner_lib::{config::EngineConfig, delay::DelaySpec, status::ErrorRate};

use crate::server::{ServerState, request_log::RequestLogConfig};

const DEFAULT_FAVICON: &[u8] = include_bytes!("../assets/favicon.ico");

/// Simulation and request logging settings.
///
/// Every setting can also be provided by its environment variable.
#[derive(Debug, Clone, clap::Args)]
pub struct SimulatorConfig {
    /// body returned by the examine endpoints
    #[arg(long, env = "ECHO_VALUE", default_value = "")]
    pub echo_value: String,

    /// percentage (0-100) of requests answered with a 500,
    /// unless a status was requested explicitly
    #[arg(
        long,
        env = "SERVER_ERROR_RATE",
        value_name = "PERCENT",
        default_value = "0"
    )]
    pub server_error_rate: ErrorRate,

    /// delay of requests which do not define one (e.g. `250` or `100..500` in ms)
    #[arg(long, env = "REQUEST_DELAY", value_name = "DELAY")]
    pub request_delay: Option<DelaySpec>,

    /// maximum cpu load units in flight per cpu load request
    /// (defaults to the available parallelism)
    #[arg(long, env = "MAX_CPU_LOAD_UNITS", value_name = "UNITS")]
    pub max_cpu_load_units: Option<NonZeroUsize>,

    /// comma separated http methods for which requests are logged
    #[arg(
        long,
        env = "LOG_METHODS",
        value_name = "METHODS",
        value_delimiter = ',',
        default_value = "GET,POST,PUT,PATCH,DELETE"
    )]
    pub log_methods: Vec<String>,

    /// comma separated (case insensitive) regular expressions,
    /// headers with a fully matching name are logged
    #[arg(long, env = "LOG_HEADERS", value_name = "PATTERNS", value_delimiter = ',')]
    pub log_headers: Vec<String>,

    /// base64 encoded icon served as `/favicon.ico`
    #[arg(long, env = "FAVICON_BASE64", value_name = "BASE64")]
    pub favicon_base64: Option<String>,
}

impl SimulatorConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            echo_value: self.echo_value.clone(),
            request_delay: self.request_delay.unwrap_or_default(),
            server_error_rate: self.server_error_rate,
            max_cpu_load_units: self.max_cpu_load_units,
        }
    }

    pub fn try_request_log_config(&self) -> Result<RequestLogConfig, BoxError> {
        let methods = self
            .log_methods
            .iter()
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .collect();

        let headers = self
            .log_headers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(header_name_pattern)
            .collect::<Result<_, _>>()?;

        Ok(RequestLogConfig::new(methods, headers))
    }

    pub fn try_favicon(&self) -> Result<Arc<[u8]>, BoxError> {
        match self.favicon_base64.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => {
                let icon = STANDARD
                    .decode(encoded)
                    .context("decode base64 favicon")?;
                Ok(icon.into())
            }
            _ => Ok(DEFAULT_FAVICON.into()),
        }
    }

    pub fn try_into_server_state(&self) -> Result<ServerState, BoxError> {
        Ok(ServerState {
            engine: Arc::new(self.engine_config()),
            request_log: self.try_request_log_config()?,
            favicon: self.try_favicon()?,
        })
    }
}

fn header_name_pattern(pattern: &str) -> Result<Regex, BoxError> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .context("compile log header pattern")
        .with_context_debug_field("pattern", || pattern.to_owned())
}
