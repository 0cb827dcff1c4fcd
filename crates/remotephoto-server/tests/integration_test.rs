//! Integration tests for the remote photo server

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode, Version},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::StreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use remotephoto_server::{build_app, AppState, ServerConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestServer {
    dir: TempDir,
    state: AppState,
    app: Router,
}

impl TestServer {
    async fn with_photos(photos: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        for name in photos {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }

        let mut config = ServerConfig::default();
        config.photo_dir = dir.path().to_path_buf();
        config.stream.keep_alive_secs = 0;

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(config, handle);
        state.show.reset().await;
        let app = build_app(state.clone());

        Self { dir, state, app }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn command(&self, form: &str, auth: Option<&str>) -> Response {
        let mut request = Request::post("/master")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        self.send(request.body(Body::from(form.to_string())).unwrap())
            .await
    }

    async fn master(&self, form: &str) -> Response {
        self.command(form, Some(&basic("gordon:secret!"))).await
    }

    async fn listing(&self) -> (StatusCode, String) {
        let response = self.get("/photos.json").await;
        let status = response.status();
        (status, body_text(response).await)
    }

    async fn clients(&self) -> usize {
        self.state.broker.client_count().await
    }
}

fn basic(raw: &str) -> String {
    format!("Basic {}", STANDARD.encode(raw))
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

type Frames = futures::stream::BoxStream<'static, Result<bytes::Bytes, axum::Error>>;

async fn listen(server: &TestServer) -> Frames {
    let response = server.get("/listen").await;
    assert_eq!(response.status(), StatusCode::OK);
    response.into_body().into_data_stream().boxed()
}

async fn next_frame(frames: &mut Frames) -> Option<String> {
    let frame = tokio::time::timeout(Duration::from_millis(200), frames.next())
        .await
        .ok()??;
    Some(String::from_utf8(frame.unwrap().to_vec()).unwrap())
}

#[tokio::test]
async fn test_viewer_page_is_public() {
    let server = TestServer::with_photos(&[]).await;
    let response = server.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("EventSource('/listen')"));
}

#[tokio::test]
async fn test_master_page_requires_auth() {
    let server = TestServer::with_photos(&[]).await;

    let response = server.get("/master").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"Restricted\""
    );

    let response = server
        .send(
            Request::get("/master")
                .header(header::AUTHORIZATION, basic("gordon:secret!"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_set_and_listing_scenario() {
    let server = TestServer::with_photos(&["b.jpg", "a.jpg"]).await;

    let (status, body) = server.listing().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"photos": ["a.jpg","b.jpg"], "id": 0}"#);

    let response = server.master("cmd=set&id=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok", "id": 1 }));
    assert_eq!(server.listing().await.1, r#"{"photos": ["a.jpg","b.jpg"], "id": 1}"#);

    let response = server.master("cmd=set&id=5").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.listing().await.1, r#"{"photos": ["a.jpg","b.jpg"], "id": 1}"#);
}

#[tokio::test]
async fn test_listing_headers() {
    let server = TestServer::with_photos(&["a.jpg"]).await;
    let response = server.get("/photos.json").await;

    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
}

#[tokio::test]
async fn test_malformed_commands() {
    let server = TestServer::with_photos(&["a.jpg"]).await;

    assert_eq!(server.master("cmd=set&id=abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.master("cmd=set").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        server.master("cmd=jump").await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(server.master("").await.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_stream_receives_set_event() {
    let server = TestServer::with_photos(&["a.jpg", "b.jpg"]).await;

    let response = server.get("/listen").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let mut frames = response.into_body().into_data_stream().boxed();

    server.master("cmd=set&id=1").await;
    assert_eq!(next_frame(&mut frames).await.unwrap(), "event: set\ndata: 1\n\n");

    server.master("cmd=reset").await;
    assert_eq!(next_frame(&mut frames).await.unwrap(), "event: reset\ndata: \n\n");
}

#[tokio::test]
async fn test_late_viewer_only_sees_later_events() {
    let server = TestServer::with_photos(&["a.jpg", "b.jpg", "c.jpg"]).await;

    let mut c1 = listen(&server).await;
    server.master("cmd=set&id=1").await;
    let mut c2 = listen(&server).await;
    server.master("cmd=set&id=2").await;

    assert_eq!(next_frame(&mut c1).await.unwrap(), "event: set\ndata: 1\n\n");
    assert_eq!(next_frame(&mut c1).await.unwrap(), "event: set\ndata: 2\n\n");
    assert_eq!(next_frame(&mut c2).await.unwrap(), "event: set\ndata: 2\n\n");
    assert_eq!(next_frame(&mut c2).await, None);
}

#[tokio::test]
async fn test_bad_auth_changes_nothing() {
    let server = TestServer::with_photos(&["a.jpg", "b.jpg"]).await;
    let mut viewer = listen(&server).await;

    for auth in [
        None,
        Some("Basic !!!".to_string()),
        Some(basic("gordon:nope")),
        Some("Digest abc".to_string()),
    ] {
        let response = server.command("cmd=set&id=1", auth.as_deref()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    assert_eq!(server.listing().await.1, r#"{"photos": ["a.jpg","b.jpg"], "id": 0}"#);
    assert_eq!(next_frame(&mut viewer).await, None);
}

#[tokio::test]
async fn test_disconnect_deregisters_viewer() {
    let server = TestServer::with_photos(&[]).await;

    let a = listen(&server).await;
    let b = listen(&server).await;
    assert_eq!(server.clients().await, 2);

    drop(a);
    assert_eq!(server.clients().await, 1);

    let response = server.get("/health").await;
    assert_eq!(body_json(response).await, json!({ "status": "ok", "clients": 1 }));

    drop(b);
    assert_eq!(server.clients().await, 0);
}

#[tokio::test]
async fn test_http10_listen_fails_fast() {
    let server = TestServer::with_photos(&[]).await;

    let response = server
        .send(
            Request::get("/listen")
                .version(Version::HTTP_10)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("Streaming unsupported"));
    assert_eq!(server.clients().await, 0);
}

#[tokio::test]
async fn test_failed_rescan_reports_error_but_still_resets() {
    let server = TestServer::with_photos(&["a.jpg", "b.jpg"]).await;
    server.master("cmd=set&id=1").await;
    let mut viewer = listen(&server).await;

    std::fs::remove_dir_all(server.dir.path()).unwrap();

    let response = server.master("cmd=reset").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(next_frame(&mut viewer).await.unwrap(), "event: reset\ndata: \n\n");

    let (status, body) = server.listing().await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("cannot read photo directory"));

    assert_eq!(server.master("cmd=set&id=0").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_steps_move_the_server_index() {
    let server = TestServer::with_photos(&["a.jpg", "b.jpg"]).await;
    let mut viewer = listen(&server).await;

    server.master("cmd=next").await;
    server.master("cmd=next").await;
    assert_eq!(server.listing().await.1, r#"{"photos": ["a.jpg","b.jpg"], "id": 1}"#);

    assert_eq!(next_frame(&mut viewer).await.unwrap(), "event: set\ndata: 1\n\n");
    // Second next was already at the last photo
    assert_eq!(next_frame(&mut viewer).await, None);
}

#[tokio::test]
async fn test_serves_photo_files() {
    let server = TestServer::with_photos(&["a.jpg"]).await;

    let response = server.get("/photos/a.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "a.jpg");

    assert_eq!(server.get("/photos/missing.jpg").await.status(), StatusCode::NOT_FOUND);
    assert_ne!(server.get("/photos/../Cargo.toml").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_nested_photo_paths_are_not_served() {
    let server = TestServer::with_photos(&["a.jpg"]).await;
    let sub = server.dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    std::fs::write(sub.join("hidden.jpg"), b"hidden").unwrap();

    server.master("cmd=reset").await;
    assert_eq!(server.listing().await.1, r#"{"photos": ["a.jpg"], "id": 0}"#);

    for uri in ["/photos/sub/hidden.jpg", "/photos/sub%2Fhidden.jpg", "/photos/sub"] {
        assert_eq!(server.get(uri).await.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_command_without_form_body_is_invalid() {
    let server = TestServer::with_photos(&["a.jpg"]).await;

    let response = server
        .send(
            Request::post("/master")
                .header(header::AUTHORIZATION, basic("gordon:secret!"))
                .body(Body::from("cmd=set&id=0"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_command");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid CMD"));
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::with_photos(&[]).await;
    assert_eq!(server.get("/nope").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/metrics").await.status(), StatusCode::OK);
}
