use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use axum::body::{Body, Bytes};
use axum::http::{self, HeaderMap, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tower::ServiceExt;

use fragments_registry::FragmentRegistry;
use fragments_server::api::{AppState, router};
use fragments_server::auth::AuthProvider;
use fragments_server::auth::bearer::BearerVerifier;
use fragments_server::auth::password::PasswordFile;
use fragments_store_memory::MemoryFragmentStore;

// -- Helpers --------------------------------------------------------------

struct TestApp {
    app: axum::Router,
}

impl TestApp {
    fn new(auth: Option<AuthProvider>, max_payload_bytes: u64, api_url: Option<&str>) -> Self {
        let registry = FragmentRegistry::builder()
            .store(Arc::new(MemoryFragmentStore::new()))
            .max_payload_bytes(max_payload_bytes)
            .build()
            .expect("registry should build");
        let state = AppState {
            registry,
            auth: auth.map(Arc::new),
            api_url: api_url.map(Arc::from),
        };
        Self { app: router(state) }
    }

    fn open() -> Self {
        Self::new(None, 1024 * 1024, None)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Create a fragment and return its id.
    async fn create(&self, content_type: &str, body: &'static [u8]) -> String {
        let (status, json) = self.json(post(content_type, body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["fragment"]["id"].as_str().unwrap().to_owned()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(content_type: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri("/v1/fragments")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn put(uri: &str, content_type: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method(http::Method::PUT)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(http::Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn with_basic(mut request: Request<Body>, user: &str, password: &str) -> Request<Body> {
    let credentials = STANDARD.encode(format!("{user}:{password}"));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Basic {credentials}").parse().unwrap(),
    );
    request
}

fn basic_provider() -> AuthProvider {
    let salt = SaltString::encode_b64(b"api-tests-salt!!").unwrap();
    let mut contents = String::new();
    for (user, password) in [
        ("user1@example.com", "password1"),
        ("user2@example.com", "password2"),
    ] {
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap();
        contents.push_str(&format!("{user}:{hash}\n"));
    }
    AuthProvider::Basic(PasswordFile::parse(&contents).unwrap())
}

// -- Health & routing -----------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let app = TestApp::open();
    let (status, headers, body) = app.send(get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["githubUrl"].is_string());
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let app = TestApp::open();
    let (status, json) = app.json(get("/no-such-route")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json,
        serde_json::json!({"status": "error", "error": {"code": 404, "message": "not found"}})
    );
}

// -- Authentication -------------------------------------------------------

#[tokio::test]
async fn health_is_public_but_fragments_need_credentials() {
    let app = TestApp::new(Some(basic_provider()), 1024, None);

    let (status, _, _) = app.send(get("/")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = app.send(get("/v1/fragments")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        headers[header::WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .starts_with("Basic")
    );
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 401);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new(Some(basic_provider()), 1024, None);
    let request = with_basic(get("/v1/fragments"), "user1@example.com", "wrong");
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticated_user_gets_empty_list() {
    let app = TestApp::new(Some(basic_provider()), 1024, None);
    let request = with_basic(get("/v1/fragments"), "user1@example.com", "password1");
    let (status, json) = app.json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"status": "ok", "fragments": []}));
}

#[tokio::test]
async fn owners_are_isolated() {
    let app = TestApp::new(Some(basic_provider()), 1024, None);

    let request = with_basic(post("text/plain", b"secret"), "user1@example.com", "password1");
    let (status, json) = app.json(request).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["fragment"]["id"].as_str().unwrap().to_owned();
    assert_eq!(
        json["fragment"]["ownerId"],
        "b36a83701f1c3191e19722d6f90274bc1b5501fe69ebf33313e440fe4b0fe210"
    );

    let uri = format!("/v1/fragments/{id}");
    let request = with_basic(get(&uri), "user2@example.com", "password2");
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = with_basic(get("/v1/fragments"), "user2@example.com", "password2");
    let (_, json) = app.json(request).await;
    assert_eq!(json["fragments"], serde_json::json!([]));
}

#[tokio::test]
async fn bearer_token_identifies_owner() {
    let secret = "test-secret";
    let app = TestApp::new(
        Some(AuthProvider::Bearer(BearerVerifier::new(secret, None))),
        1024,
        None,
    );
    let claims = serde_json::json!({
        "email": "user1@example.com",
        "exp": jsonwebtoken::get_current_timestamp() + 600,
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let mut request = post("text/plain", b"hi");
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, json) = app.json(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        json["fragment"]["ownerId"],
        "b36a83701f1c3191e19722d6f90274bc1b5501fe69ebf33313e440fe4b0fe210"
    );

    let mut request = get("/v1/fragments");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer not-a-jwt".parse().unwrap());
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Create ---------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_location() {
    let app = TestApp::open();
    let mut request = post("text/plain; charset=utf-8", b"hello fragments");
    request
        .headers_mut()
        .insert(header::HOST, "localhost:8080".parse().unwrap());
    let (status, headers, body) = app.send(request).await;

    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    let fragment = &json["fragment"];
    assert_eq!(fragment["type"], "text/plain; charset=utf-8");
    assert_eq!(fragment["size"], 15);
    assert!(fragment["created"].is_string());
    assert!(fragment["updated"].is_string());

    let id = fragment["id"].as_str().unwrap();
    assert_eq!(
        headers[header::LOCATION],
        format!("http://localhost:8080/v1/fragments/{id}").as_str()
    );
}

#[tokio::test]
async fn location_prefers_api_url() {
    let app = TestApp::new(None, 1024, Some("https://fragments.example.com/"));
    let (status, headers, body) = app.send(post("text/markdown", b"# hi")).await;

    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id = json["fragment"]["id"].as_str().unwrap();
    assert_eq!(
        headers[header::LOCATION],
        format!("https://fragments.example.com/v1/fragments/{id}").as_str()
    );
}

#[tokio::test]
async fn unsupported_type_is_415() {
    let app = TestApp::open();
    let (status, json) = app.json(post("application/msword", b"doc")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["error"]["code"], 415);

    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/v1/fragments")
        .body(Body::from("no type"))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn invalid_json_is_415_and_not_stored() {
    let app = TestApp::open();
    let (status, _) = app.json(post("application/json", b"{not json")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (_, json) = app.json(get("/v1/fragments")).await;
    assert_eq!(json["fragments"], serde_json::json!([]));
}

#[tokio::test]
async fn oversized_body_is_413() {
    let app = TestApp::new(None, 8, None);
    let (status, _, _) = app.send(post("text/plain", b"more than eight bytes")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// -- Read -----------------------------------------------------------------

#[tokio::test]
async fn get_returns_raw_data_with_stored_type() {
    let app = TestApp::open();
    let id = app.create("text/markdown", b"# Heading level 1").await;

    let (status, headers, body) = app.send(get(&format!("/v1/fragments/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
    assert_eq!(&body[..], b"# Heading level 1");
}

#[tokio::test]
async fn markdown_converts_to_html() {
    let app = TestApp::open();
    let id = app.create("text/markdown", b"# Heading level 1").await;

    let (status, headers, body) = app.send(get(&format!("/v1/fragments/{id}.html"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(&body[..], b"<h1>Heading level 1</h1>\n");
}

#[tokio::test]
async fn own_extension_is_passthrough() {
    let app = TestApp::open();
    let id = app.create("text/markdown", b"*x*").await;

    let (status, headers, body) = app.send(get(&format!("/v1/fragments/{id}.md"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
    assert_eq!(&body[..], b"*x*");
}

#[tokio::test]
async fn unreachable_conversion_is_415() {
    let app = TestApp::open();
    let id = app.create("text/csv", b"a,b\n1,2\n").await;

    let (status, json) = app.json(get(&format!("/v1/fragments/{id}.png"))).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["status"], "error");

    let (status, _) = app.json(get(&format!("/v1/fragments/{id}.exe"))).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, headers, body) = app.send(get(&format!("/v1/fragments/{id}.json"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let rows: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows, serde_json::json!([{"a": "1", "b": "2"}]));
}

#[tokio::test]
async fn missing_fragment_is_404() {
    let app = TestApp::open();
    let (status, json) = app.json(get("/v1/fragments/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], 404);

    let (status, _) = app.json(get("/v1/fragments/does-not-exist.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn info_returns_metadata() {
    let app = TestApp::open();
    let id = app.create("application/json", br#"{"a":1}"#).await;

    let (status, json) = app.json(get(&format!("/v1/fragments/{id}/info"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["fragment"]["id"], id.as_str());
    assert_eq!(json["fragment"]["type"], "application/json");
    assert_eq!(json["fragment"]["size"], 7);
}

#[tokio::test]
async fn list_expands_to_full_records() {
    let app = TestApp::open();
    let a = app.create("text/plain", b"a").await;
    let b = app.create("text/plain", b"bb").await;

    let (_, json) = app.json(get("/v1/fragments")).await;
    let ids: Vec<&str> = json["fragments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let mut expected = vec![a.as_str(), b.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);

    let (status, json) = app.json(get("/v1/fragments?expand=1")).await;
    assert_eq!(status, StatusCode::OK);
    let records = json["fragments"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["type"] == "text/plain"));
    assert!(records.iter().any(|r| r["size"] == 2));
}

// -- Update ---------------------------------------------------------------

#[tokio::test]
async fn put_replaces_data() {
    let app = TestApp::open();
    let id = app.create("text/plain", b"before").await;
    let uri = format!("/v1/fragments/{id}");

    let (status, json) = app.json(put(&uri, "text/plain", b"after!!")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fragment"]["size"], 7);

    let (_, _, body) = app.send(get(&uri)).await;
    assert_eq!(&body[..], b"after!!");
}

#[tokio::test]
async fn put_cannot_change_type() {
    let app = TestApp::open();
    let id = app.create("text/plain", b"text").await;

    let (status, json) = app
        .json(put(&format!("/v1/fragments/{id}"), "text/markdown", b"# md"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], 400);
}

#[tokio::test]
async fn put_missing_is_404() {
    let app = TestApp::open();
    let (status, _) = app
        .json(put("/v1/fragments/nope", "text/plain", b"x"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Delete ---------------------------------------------------------------

#[tokio::test]
async fn delete_then_not_found() {
    let app = TestApp::open();
    let id = app.create("text/plain", b"bye").await;
    let uri = format!("/v1/fragments/{id}");

    let (status, json) = app.json(delete(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"status": "ok"}));

    let (status, _, _) = app.send(get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json(delete(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
