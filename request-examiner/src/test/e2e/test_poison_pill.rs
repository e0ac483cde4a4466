use std::time::{Duration, Instant};

use rama::http::{StatusCode, service::client::HttpClientExt as _};

use request_examiner_lib::shutdown::ExitCode;

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_poison_pill_exits_with_requested_code() {
    let (runtime, exit_rx) = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    let start = Instant::now();
    let resp = client
        .delete(runtime.url("/poison-pill?delay=100&exit=3"))
        .send()
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(StatusCode::NO_CONTENT, resp.status());

    let code = tokio::time::timeout(Duration::from_secs(30), exit_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ExitCode::from(3), code);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_poison_pill_defaults_to_success() {
    let (runtime, exit_rx) = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    let resp = client
        .delete(runtime.url("/poison-pill?exit=oops"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, resp.status());

    let code = tokio::time::timeout(Duration::from_secs(30), exit_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ExitCode::SUCCESS, code);
}
