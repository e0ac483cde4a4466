use std::{io::ErrorKind, path::PathBuf, sync::LazyLock, time::Duration};

use clap::Parser;
use rama::{
    Layer as _, Service,
    error::BoxError,
    http::{
        Body, Request, Response,
        client::EasyHttpWebClient,
        layer::{map_request_body::MapRequestBodyLayer, map_response_body::MapResponseBodyLayer},
    },
    layer::TimeoutLayer,
    net::address::SocketAddress,
};
use tokio::sync::oneshot;

use request_examiner_lib::shutdown::ExitCode;

use crate::Args;

#[derive(Clone)]
pub(super) struct Runtime {
    _app: App,

    addr: SocketAddress,
}

impl Runtime {
    #[inline(always)]
    pub fn socket_addr(&self) -> SocketAddress {
        self.addr
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    #[inline(always)]
    pub fn client(&self) -> impl Service<Request, Output = Response, Error = BoxError> {
        (
            // large enough to cover the slowest simulated requests
            TimeoutLayer::new(Duration::from_secs(60)),
            MapResponseBodyLayer::new(Body::new),
            MapRequestBodyLayer::new(Body::new),
        )
            .into_layer(EasyHttpWebClient::default())
    }
}

#[derive(Clone)]
struct App {
    data_dir: PathBuf,
}

/// Shared runtime, running with the default simulator config.
pub(super) async fn get() -> Runtime {
    static APP: LazyLock<App> = LazyLock::new(|| {
        let (data_dir, _exit_rx) = spawn_request_examiner_app_with_args(&[]);
        App { data_dir }
    });

    let app = APP.clone();
    new_runtime(app).await
}

/// Dedicated runtime, for tests which use a custom config
/// or which stop the server.
///
/// The receiver resolves with the exit code once the server stopped.
pub(super) async fn spawn_with_args(
    extra_args: &[&str],
) -> (Runtime, oneshot::Receiver<ExitCode>) {
    let (data_dir, exit_rx) = spawn_request_examiner_app_with_args(extra_args);
    let runtime = new_runtime(App { data_dir }).await;
    (runtime, exit_rx)
}

async fn new_runtime(app: App) -> Runtime {
    let addr = tokio::time::timeout(
        Duration::from_secs(60),
        read_file_or_wait(app.data_dir.join("examiner.addr.txt")),
    )
    .await
    .unwrap();

    let runtime = Runtime { _app: app, addr };
    assert!(runtime.socket_addr().ip_addr.is_loopback());
    runtime
}

async fn read_file_or_wait(path: PathBuf) -> SocketAddress {
    loop {
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => match s.trim().parse() {
                Ok(addr) => return addr,
                Err(err) => {
                    eprintln!("socket addr not (yet) readable (content={s:?}): {err}");
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => (),
            Err(err) => panic!("unexpected error: {err}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn spawn_request_examiner_app_with_args(
    extra_args: &[&str],
) -> (PathBuf, oneshot::Receiver<ExitCode>) {
    let data_dir = crate::test::tmp_dir::try_new("request_examiner_app_e2e").unwrap();
    eprintln!("request_examiner_app_e2e all data stored under: {data_dir:?}");

    let data_dir_str = data_dir.display().to_string().leak();

    let mut argv: Vec<&str> = vec![
        request_examiner_lib::utils::env::project_name(),
        "--bind",
        "127.0.0.1:0",
        "--data",
        data_dir_str,
        "--graceful",
        "0.42",
    ];
    argv.extend(extra_args);

    let args = Args::try_parse_from(argv).unwrap();

    let (exit_tx, exit_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future = crate::run_with_args(std::future::pending::<()>(), args);
        let code = rt.block_on(server_future).expect("serve without errors");
        let _ = exit_tx.send(code);
    });

    (data_dir, exit_rx)
}
