#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

use rama::{
    error::{BoxError, ErrorContext},
    graceful::{self, ShutdownGuard},
    net::socket::Interface,
    telemetry::tracing::{self, Instrument as _},
};

use clap::Parser;

use request_examiner_lib::{
    shutdown::{self, ExitCode, ExitHandle, ExitListener},
    utils,
};

pub mod config;
pub mod server;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;


/// CLI arguments for configuring the request examiner.
#[derive(Debug, Clone, Parser)]
#[command(name = "request-examiner")]
#[command(bin_name = "request-examiner")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the http server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        env = "EXAMINER_BIND",
        default_value = "127.0.0.1:8080"
    )]
    pub bind: Interface,

    #[command(flatten)]
    pub simulator: config::SimulatorConfig,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// directory in which data (e.g. the bound server address) will be stored
    #[arg(long, short = 'D', default_value = ".request-examiner")]
    pub data: PathBuf,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 5.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[cfg(target_family = "unix")]
    /// Set the limit of max open file descriptors for this process and its children.
    #[arg(long, value_name = "N", default_value_t = 262_144)]
    pub ulimit: utils::os::rlim_t,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    #[cfg(target_family = "unix")]
    utils::os::raise_nofile(args.ulimit).context("set file descriptor limit")?;

    let base_shutdown_signal = graceful::default_signal();
    match run_with_args(base_shutdown_signal, args).await {
        Ok(ExitCode::SUCCESS) => Ok(()),
        Ok(code) => {
            tracing::info!("exit with requested code: {}", code.get());
            std::process::exit(code.get());
        }
        Err(err) => {
            eprintln!("🚩 exit with error: {err}");
            std::process::exit(1);
        }
    }
}

/// Runs the request examiner http server and blocks until
/// a critical error occurs or the (graceful) shutdown has been initiated,
/// either by the base signal or by a poison pill request.
///
/// Returns the exit code the process is expected to exit with.
///
/// This entry point is used by both the (binary) `main` function as well as
/// for the e2e test suite found in the test module.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<ExitCode, BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    tokio::fs::create_dir_all(&args.data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || args.data.clone())?;

    let state = args
        .simulator
        .try_into_server_state()
        .context("prepare request examiner config")?;
    tracing::info!(
        request_delay = %state.engine.request_delay,
        server_error_rate = %state.engine.server_error_rate,
        "request examiner config ready",
    );

    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let exit_code = Arc::new(OnceLock::new());
    let (exit_handle, exit_listener) = shutdown::exit_channel();
    let (error_tx, error_rx) = tokio::sync::mpsc::channel::<BoxError>(1);
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        exit_listener,
        exit_code.clone(),
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(move |guard| run_http_server(args, guard, error_tx, state, exit_handle));

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");
    Ok(exit_code.get().copied().unwrap_or_default())
}

async fn run_http_server(
    args: Args,
    guard: ShutdownGuard,
    error_tx: tokio::sync::mpsc::Sender<BoxError>,
    state: server::ServerState,
    exit_handle: ExitHandle,
) {
    tracing::info!("spawning http server...");
    if let Err(err) = server::run_http_server(args, guard, state, exit_handle)
        .instrument(tracing::debug_span!(
            "http server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("http server exited with an error: {err}");
        let _ = error_tx.send(err).await;
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::mpsc::Receiver<BoxError>,
    exit_listener: ExitListener,
    exit_code: Arc<OnceLock<ExitCode>>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        let mut error_rx = error_rx;
        let mut exit_listener = exit_listener;
        let mut signal = Box::pin(base_shutdown_signal);

        tokio::select! {
            _ = signal.as_mut() => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            Some(err) = error_rx.recv() => {
                tracing::error!("fatal err received: {err}; abort");
                let _ = exit_code.set(ExitCode::from(1));
            }
            Some(code) = exit_listener.recv() => {
                tracing::info!("exit requested with code {}: init graceful shutdown", code.get());
                let _ = exit_code.set(code);
            }
        }
    }
}
