use std::{convert::Infallible, sync::Arc, time::Instant};

use rama::{
    Service,
    http::{
        BodyExtractExt as _, HeaderValue, Method, Request, Response, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION},
        headers::ContentType,
        service::web::response::{Headers, IntoResponse},
    },
    telemetry::tracing,
};
use serde::Serialize;

use request_examiner_lib::{
    config::EngineConfig,
    delay::DelaySpec,
    shutdown::{self, ExitHandle},
    simulation::{self, ShutdownParams, SimulationParams},
};

use super::metrics::Metrics;

/// All endpoints served by the [`ExaminerHttpServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Favicon,
    Examine,
    Post,
    PoisonPill,
    Metrics,
    Live,
    Ready,
    NotFound,
}

impl Route {
    pub const ALL: [Self; 9] = [
        Self::Root,
        Self::Favicon,
        Self::Examine,
        Self::Post,
        Self::PoisonPill,
        Self::Metrics,
        Self::Live,
        Self::Ready,
        Self::NotFound,
    ];

    pub fn resolve(method: &Method, path: &str) -> Self {
        if method == Method::POST {
            return Self::Post;
        }

        if method == Method::DELETE {
            return if path == "/poison-pill" {
                Self::PoisonPill
            } else {
                Self::NotFound
            };
        }

        if method != Method::GET {
            return Self::NotFound;
        }

        match path {
            "/" => Self::Root,
            "/favicon.ico" => Self::Favicon,
            "/metrics" => Self::Metrics,
            "/.well-known/live" => Self::Live,
            "/.well-known/ready" => Self::Ready,
            "/examine" => Self::Examine,
            path if path.starts_with("/examine/") => Self::Examine,
            _ => Self::NotFound,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Favicon => "favicon",
            Self::Examine => "examine",
            Self::Post => "post",
            Self::PoisonPill => "poison_pill",
            Self::Metrics => "metrics",
            Self::Live => "live",
            Self::Ready => "ready",
            Self::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    checks: Vec<String>,
}

#[derive(Debug)]
pub struct ExaminerHttpServer {
    engine: Arc<EngineConfig>,
    favicon: Arc<[u8]>,
    exit: ExitHandle,
    metrics: Metrics,
}

impl ExaminerHttpServer {
    pub fn new(engine: Arc<EngineConfig>, favicon: Arc<[u8]>, exit: ExitHandle) -> Self {
        Self {
            engine,
            favicon,
            exit,
            metrics: Metrics::install(),
        }
    }

    async fn simulate(&self, query: Option<&str>) -> StatusCode {
        let params = SimulationParams::from_query(query);
        let outcome = simulation::simulate(&self.engine, &params).await;
        self.metrics.record_behavior(outcome.behavior_kind());

        tracing::debug!(
            behavior = %outcome.behavior_kind(),
            duration = ?outcome.behavior.duration(),
            status = outcome.status,
            "request simulated",
        );

        StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    async fn examine(&self, req: Request) -> Response {
        let status = self.simulate(req.uri().query()).await;
        (status, self.engine.echo_body().to_owned()).into_response()
    }

    async fn post(&self, req: Request) -> Response {
        let query = req.uri().query().map(ToOwned::to_owned);
        match req.try_into_string().await {
            Ok(body) if body.is_empty() => tracing::info!("received POST without body"),
            Ok(body) => tracing::info!("received POST with body: {body}"),
            Err(err) => tracing::warn!("failed to read POST body: {err}"),
        }
        self.simulate(query.as_deref()).await.into_response()
    }

    async fn poison_pill(&self, req: Request) -> Response {
        let params = ShutdownParams::from_query(req.uri().query());
        let delay = DelaySpec::parse(params.delay.as_deref());
        shutdown::trigger(&delay, params.exit.as_deref(), &self.exit).await;
        StatusCode::NO_CONTENT.into_response()
    }

    fn favicon(&self) -> Response {
        (
            StatusCode::OK,
            [
                (CONTENT_TYPE, HeaderValue::from_static("image/x-icon")),
                (CACHE_CONTROL, HeaderValue::from_static("max-age=2147483647")),
            ],
            self.favicon.to_vec(),
        )
            .into_response()
    }

    fn metrics(&self) -> Response {
        (
            StatusCode::OK,
            [(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            )],
            self.metrics.render(),
        )
            .into_response()
    }

    fn health() -> Response {
        let report = HealthReport {
            status: "UP",
            checks: Vec::new(),
        };
        match serde_json::to_string(&report) {
            Ok(body) => {
                (StatusCode::OK, Headers::single(ContentType::json()), body).into_response()
            }
            Err(err) => {
                tracing::error!("failed to serialize health report: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl Service<Request> for ExaminerHttpServer {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let start = Instant::now();
        let route = Route::resolve(req.method(), req.uri().path());
        self.metrics.record_request(route);

        let resp = match route {
            Route::Root => (
                StatusCode::MOVED_PERMANENTLY,
                [(LOCATION, HeaderValue::from_static("examine"))],
            )
                .into_response(),
            Route::Favicon => self.favicon(),
            Route::Examine => self.examine(req).await,
            Route::Post => self.post(req).await,
            Route::PoisonPill => self.poison_pill(req).await,
            Route::Metrics => self.metrics(),
            Route::Live | Route::Ready => Self::health(),
            Route::NotFound => StatusCode::NOT_FOUND.into_response(),
        };

        self.metrics.record_response(route, resp.status(), start.elapsed());
        Ok(resp)
    }
}
