use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use evreg::domain::config::ApiConfig;
use evreg_server::Server;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn server(database: &str, seats: u32) -> Server {
    let mut cfg = ApiConfig::default();
    cfg.database.url = "mem://".to_owned();
    cfg.database.database = database.to_owned();
    cfg.event.default_total_seats = seats;

    Server::builder().config(cfg).build().await.expect("server should build")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn serves_health_docs_and_registration_routes() {
    let server = server("routes", 1).await;
    let app = server.app();

    let health = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(json_body(health).await["status"], "up");

    let docs = app
        .clone()
        .oneshot(Request::get("/api").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(docs.status(), StatusCode::OK);

    let register = |phone: &str| {
        Request::post("/api/registrations")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "firstName": "Ada", "lastName": "Lovelace", "phoneNumber": phone }).to_string(),
            ))
            .expect("request")
    };

    let created = app.clone().oneshot(register("1234567890")).await.expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);

    let full = app.clone().oneshot(register("1234567891")).await.expect("response");
    assert_eq!(full.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(full).await["code"], "CAPACITY_EXCEEDED");

    let seats = app
        .oneshot(Request::get("/api/registrations/seats").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(json_body(seats).await, json!({ "remainingSeats": 0, "totalSeats": 1 }));
}

#[tokio::test]
async fn cors_allows_configured_origins() {
    let server = server("cors", 10).await;

    let response = server
        .app()
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn missing_certificates_fail_the_build() {
    let mut cfg = ApiConfig::default();
    cfg.server.ssl = Some(evreg::domain::config::SslConfig {
        cert: "/nonexistent/cert.pem".into(),
        key: "/nonexistent/key.pem".into(),
    });

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(err.to_string().contains("TLS certificate not found"));
}

#[tokio::test]
async fn missing_private_key_fails_the_build() {
    let cert = tempfile::NamedTempFile::new().expect("temp cert");
    let mut cfg = ApiConfig::default();
    cfg.server.ssl = Some(evreg::domain::config::SslConfig {
        cert: cert.path().to_path_buf(),
        key: "/nonexistent/key.pem".into(),
    });

    let err = Server::builder().config(cfg).build().await.unwrap_err();
    assert!(err.to_string().contains("TLS key not found"), "{err}");
}
