use rama::http::{
    BodyExtractExt as _, StatusCode,
    header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION},
    service::client::HttpClientExt as _,
};

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_root_redirects_to_examine() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    let resp = client.get(runtime.url("/")).send().await.unwrap();
    assert_eq!(StatusCode::MOVED_PERMANENTLY, resp.status());
    assert_eq!("examine", resp.headers()[LOCATION]);
    assert!(resp.headers().contains_key("server"));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_favicon() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    let resp = client.get(runtime.url("/favicon.ico")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!("image/x-icon", resp.headers()[CONTENT_TYPE]);
    assert_eq!("max-age=2147483647", resp.headers()[CACHE_CONTROL]);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_post_any_path() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for path in ["/", "/examine", "/some/form?status=418"] {
        let resp = client
            .post(runtime.url(path))
            .body("field=value")
            .send()
            .await
            .unwrap();
        let expected = if path.ends_with("status=418") {
            StatusCode::IM_A_TEAPOT
        } else {
            StatusCode::OK
        };
        assert_eq!(expected, resp.status(), "path = {path}");
        assert_eq!("", resp.try_into_string().await.unwrap(), "path = {path}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_health() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for path in ["/.well-known/live", "/.well-known/ready"] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "path = {path}");

        let payload: serde_json::Value = resp.try_into_json().await.unwrap();
        assert_eq!(
            serde_json::json!({"status": "UP", "checks": []}),
            payload,
            "path = {path}"
        );
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_metrics() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    let resp = client
        .get(runtime.url("/examine?status=500"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, resp.status());

    let resp = client.get(runtime.url("/metrics")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());

    let payload = resp.try_into_string().await.unwrap();
    assert!(payload.contains("# TYPE examiner_requests_total counter"));
    assert!(payload.contains("examiner_requests_total{route=\"metrics\"}"));
    assert!(payload.contains("examiner_responses_total{class=\"5xx\"} "));
    assert!(payload.contains("examiner_behaviors_total{kind=\"noop\"} "));
    assert!(payload.contains("examiner_request_duration_seconds_count{route=\"examine\"} "));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_not_found() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for path in ["/examined", "/poison-pill", "/.well-known/health"] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(StatusCode::NOT_FOUND, resp.status(), "path = {path}");
    }

    let resp = client.put(runtime.url("/examine")).send().await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, resp.status());
}
