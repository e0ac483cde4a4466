use std::{fmt::Write as _, sync::Arc};

use rama::{
    Layer, Service,
    extensions::ExtensionsRef as _,
    http::{Request, Response},
    net::stream::SocketInfo,
    telemetry::tracing,
};
use regex::Regex;

/// Which requests are logged, and which of their headers.
#[derive(Debug, Clone)]
pub struct RequestLogConfig {
    methods: Arc<[String]>,
    headers: Arc<[Regex]>,
}

impl RequestLogConfig {
    /// Header patterns are expected to be anchored,
    /// such that they only match full header names.
    pub fn new(methods: Vec<String>, headers: Vec<Regex>) -> Self {
        Self {
            methods: methods.into(),
            headers: headers.into(),
        }
    }

    pub fn logs_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn logs_header(&self, name: &str) -> bool {
        self.headers.iter().any(|re| re.is_match(name))
    }

    pub fn into_layer(self) -> RequestLogLayer {
        RequestLogLayer(self)
    }

    /// `None` if the method of the request is not logged.
    fn format_request(&self, req: &Request) -> Option<String> {
        if !self.logs_method(req.method().as_str()) {
            return None;
        }

        let mut message = format!("{} {} from ", req.method(), req.uri());
        match req.extensions().get::<SocketInfo>() {
            Some(info) => {
                let _ = write!(message, "{}", info.peer_addr());
            }
            None => message.push_str("unknown"),
        }
        for (name, value) in req.headers() {
            if self.logs_header(name.as_str()) {
                let _ = write!(
                    message,
                    "\n> {name}: {}",
                    String::from_utf8_lossy(value.as_bytes())
                );
            }
        }
        Some(message)
    }
}

#[derive(Debug, Clone)]
pub struct RequestLogService<S> {
    inner: S,
    cfg: RequestLogConfig,
}

/// Created using [`RequestLogConfig::into_layer`].
#[derive(Debug, Clone)]
pub struct RequestLogLayer(RequestLogConfig);

impl<S> Service<Request> for RequestLogService<S>
where
    S: Service<Request, Output = Response>,
{
    type Output = Response;
    type Error = S::Error;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        if let Some(message) = self.cfg.format_request(&req) {
            tracing::info!("{message}");
        }
        self.inner.serve(req).await
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            cfg: self.0.clone(),
        }
    }

    fn into_layer(self, inner: S) -> Self::Service {
        RequestLogService { inner, cfg: self.0 }
    }
}
