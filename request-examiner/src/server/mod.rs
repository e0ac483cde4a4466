use std::{path::Path, sync::Arc};

use rama::{
    Layer as _,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
    },
    net::address::SocketAddress,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use request_examiner_lib::{config::EngineConfig, shutdown::ExitHandle, utils};

use crate::Args;

pub mod request_log;
pub mod routes;

mod metrics;

use self::{request_log::RequestLogConfig, routes::ExaminerHttpServer};

/// Everything the http server needs, prepared before it is spawned.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub engine: Arc<EngineConfig>,
    pub request_log: RequestLogConfig,
    pub favicon: Arc<[u8]>,
}

pub async fn run_http_server(
    args: Args,
    guard: ShutdownGuard,
    state: ServerState,
    exit_handle: ExitHandle,
) -> Result<(), BoxError> {
    let ServerState {
        engine,
        request_log,
        favicon,
    } = state;

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::server_identifier())),
        request_log.into_layer(),
    )
        .into_layer(Arc::new(ExaminerHttpServer::new(
            engine,
            favicon,
            exit_handle,
        )));

    let exec = Executor::graceful(guard);
    let http_server = HttpServer::auto(exec.clone()).service(Arc::new(http_svc));

    let tcp_listener = TcpListener::bind(args.bind, exec)
        .await
        .context("bind request examiner http server")?;

    let server_addr = tcp_listener
        .local_addr()
        .context("get bound address for request examiner http server")?;

    tracing::info!("request examiner http server bound to: {server_addr}");
    write_server_socket_address_as_file(&args.data, "examiner", server_addr.into()).await?;

    tcp_listener.serve(http_server).await;

    Ok(())
}

async fn write_server_socket_address_as_file(
    dir: &Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}
