use std::time::Duration;

use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prefsync_http::{Error, PreferencesApi};

fn connect(uri: &str) -> PreferencesApi {
    PreferencesApi::connect(&format!("{}/api/user/", uri), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_all_reads_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "app-theme": "dark",
            "app-zoom": "17"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();

    let prefs = tokio::task::spawn_blocking(move || connect(&uri).fetch_all().unwrap())
        .await
        .unwrap();

    assert_eq!(prefs.len(), 2);
    assert_eq!(prefs["app-theme"], "dark");
    assert_eq!(prefs["app-zoom"], "17");
}

#[tokio::test]
async fn test_put_sends_plain_text() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/user/preferences/app-theme"))
        .and(header("Authorization", "Bearer token123"))
        .and(header("Content-Type", "text/plain; charset=utf-8"))
        .and(body_string("dark"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || {
        connect(&uri)
            .with_token("token123")
            .put("app-theme", "dark")
    })
    .await
    .unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_delete_request() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/user/preferences/app-theme"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || connect(&uri).delete("app-theme"))
        .await
        .unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_delete_of_unknown_key_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/user/preferences/app-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || connect(&uri).delete("app-gone"))
        .await
        .unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_error_response() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/user/preferences/app-theme"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || connect(&uri).put("app-theme", "dark"))
        .await
        .unwrap();

    match result {
        Err(Error::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/preferences"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || connect(&uri).fetch_all())
        .await
        .unwrap();

    assert!(matches!(result, Err(Error::Status { status: 401, .. })));
}
