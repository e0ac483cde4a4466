use std::time::{Duration, Instant};

use rama::{
    Service,
    error::BoxError,
    http::{BodyExtractExt as _, Request, Response, StatusCode, service::client::HttpClientExt as _},
};

use crate::test::e2e;

async fn get_examine(
    runtime: &e2e::runtime::Runtime,
    client: &impl Service<Request, Output = Response, Error = BoxError>,
    path_and_query: &str,
) -> (StatusCode, Duration) {
    let start = Instant::now();
    let resp = client
        .get(runtime.url(path_and_query))
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();
    (resp.status(), elapsed)
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_default() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for path in ["/examine", "/examine/", "/examine/some/nested/path"] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "path = {path}");
        assert_eq!("", resp.try_into_string().await.unwrap(), "path = {path}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_explicit_status() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for (query, expected) in [
        ("status=418", StatusCode::IM_A_TEAPOT),
        ("status=503", StatusCode::SERVICE_UNAVAILABLE),
        ("status=201", StatusCode::CREATED),
        ("status=abc", StatusCode::OK),
        ("status=199", StatusCode::OK),
        ("status=600", StatusCode::OK),
        ("status=", StatusCode::OK),
    ] {
        for _ in 0..3 {
            let (status, _) = get_examine(&runtime, &client, &format!("/examine?{query}")).await;
            assert_eq!(expected, status, "query = {query}");
        }
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_fixed_delay() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    let (status, elapsed) = get_examine(&runtime, &client, "/examine?delay=200").await;
    assert_eq!(StatusCode::OK, status);
    assert!(elapsed >= Duration::from_millis(200), "elapsed = {elapsed:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_range_delay() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for query in ["delay=500..1000", "delay=500.1000", "delay=500....1000"] {
        let (status, elapsed) = get_examine(&runtime, &client, &format!("/examine?{query}")).await;
        assert_eq!(StatusCode::OK, status, "query = {query}");
        assert!(
            elapsed >= Duration::from_millis(500) && elapsed <= Duration::from_millis(1050),
            "query = {query}; elapsed = {elapsed:?}"
        );
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_invalid_delay() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for query in [
        "delay=abc",
        "delay=",
        "delay=1000..500",
        "delay=-5",
        "delay=1.5.5",
        "delay=..500",
    ] {
        let (status, elapsed) = get_examine(&runtime, &client, &format!("/examine?{query}")).await;
        assert_eq!(StatusCode::OK, status, "query = {query}");
        assert!(
            elapsed < Duration::from_millis(400),
            "query = {query}; elapsed = {elapsed:?}"
        );
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_cpu_load() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for query in [
        "delay=10&load=50",
        "delay=100&load=100",
        "delay=50..100&load=1",
        "delay=50&load=80&allocation=80",
    ] {
        let (status, elapsed) = get_examine(&runtime, &client, &format!("/examine?{query}")).await;
        assert_eq!(StatusCode::OK, status, "query = {query}");
        assert!(
            elapsed >= Duration::from_millis(10),
            "query = {query}; elapsed = {elapsed:?}"
        );
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_memory_allocation() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    let (status, elapsed) =
        get_examine(&runtime, &client, "/examine?delay=100&allocation=10&status=202").await;
    assert_eq!(StatusCode::ACCEPTED, status);
    assert!(elapsed >= Duration::from_millis(100), "elapsed = {elapsed:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_examine_weight_without_delay() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for query in ["load=100", "allocation=100", "load=50&allocation=50"] {
        let (status, elapsed) = get_examine(&runtime, &client, &format!("/examine?{query}")).await;
        assert_eq!(StatusCode::OK, status, "query = {query}");
        assert!(
            elapsed < Duration::from_millis(400),
            "query = {query}; elapsed = {elapsed:?}"
        );
    }
}
