//! HTTP boundary of the user service.
//!
//! [`build_app`] wires the routes and middleware around an [`AppState`];
//! [`run_server`] opens the database, serves until a shutdown signal and
//! closes the pool.

use axum::{
    Router, ServiceExt,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
};
use anyhow::Context;
use configuration::{AppSettings, Settings};
use core_types::GENERIC;
use database::{ConnectionConfig, Database, DbError, HealthCheck, PgUserRepository};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    normalize_path::NormalizePath,
    trace::TraceLayer,
};
use users::{Creator, CreatorUseCase, Getter, GetterUseCase};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod payload;
pub mod telemetry;

use crate::error::ApiError;

/// Largest request body accepted.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// How long browsers may cache a CORS preflight.
const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub user_creator: Arc<dyn CreatorUseCase>,
    pub user_getter: Arc<dyn GetterUseCase>,
    pub health: Arc<dyn HealthCheck>,
}

/// Builds the router with its middleware stack.
///
/// Trailing slashes are trimmed before routing, so `/v1/user/` and `/v1/user`
/// reach the same handler.
pub fn build_app(state: Arc<AppState>, settings: &AppSettings) -> anyhow::Result<NormalizePath<Router>> {
    let origins = settings
        .origins()
        .into_iter()
        .map(|origin| {
            HeaderValue::from_str(&origin).with_context(|| format!("Invalid CORS origin {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::any())
        .max_age(CORS_MAX_AGE);

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/user", get(handlers::list_users).post(handlers::create_user))
        .route("/v1/user/:id", get(handlers::get_user))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http());

    Ok(NormalizePath::trim_trailing_slash(router))
}

/// Turns a handler panic into the generic error envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError(GENERIC.raise(format!("Handler panicked: {detail}"))).into_response()
}

/// Opens the pool described by `settings`, retrying until the configured deadline.
pub async fn connect_database(settings: &Settings) -> Result<Database, DbError> {
    let config = ConnectionConfig {
        dsn: settings.database.dsn(),
        application_name: settings.app.name.clone(),
        min_connections: settings.database.min_connections,
        max_connections: settings.database.max_connections,
        connect_retries: settings.database.connect_retries,
    };

    Database::connect(&config).await
}

/// The main function to configure and run the web server.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let database = connect_database(&settings).await?;
    database.run_migrations().await?;

    let repository = PgUserRepository::new(database.pool().clone());
    let state = Arc::new(AppState {
        user_creator: Arc::new(Creator::new(repository.clone())),
        user_getter: Arc::new(Getter::new(repository)),
        health: Arc::new(database.clone()),
    });
    let app = build_app(state, &settings.app)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.app.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    tracing::info!(%addr, environment = ?settings.app.environment, "Web server listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database
        .close(Duration::from_secs(settings.app.graceful_timeout))
        .await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use configuration::{Environment, Scheme};
    use core_types::{EXISTING_USERNAME, Exception, USER_BELOW_AGE, USER_MIN_AGE, USER_NOT_EXISTS, User};
    use serde_json::{Value, json};
    use tower::ServiceExt as _;
    use uuid::Uuid;

    struct StubCreator;

    #[async_trait]
    impl CreatorUseCase for StubCreator {
        async fn create(&self, name: String, username: String, age: i32) -> Result<User, Exception> {
            if age < USER_MIN_AGE {
                return Err(USER_BELOW_AGE.raise("underage"));
            }
            if username == "taken" {
                return Err(EXISTING_USERNAME.raise("taken"));
            }
            Ok(User::new(name, username, age))
        }
    }

    struct StubGetter {
        users: Vec<User>,
    }

    #[async_trait]
    impl GetterUseCase for StubGetter {
        async fn get_by_id(&self, id: Uuid) -> Result<User, Exception> {
            self.users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| USER_NOT_EXISTS.raise("missing"))
        }

        async fn list(&self, username: &str) -> Result<Vec<User>, Exception> {
            if username == "boom" {
                panic!("list exploded");
            }
            Ok(self
                .users
                .iter()
                .filter(|u| u.username.contains(username))
                .cloned()
                .collect())
        }
    }

    struct StubHealth(bool);

    #[async_trait]
    impl HealthCheck for StubHealth {
        async fn health(&self) -> Result<(), DbError> {
            if self.0 {
                Ok(())
            } else {
                Err(DbError::PoolBelowMinimum { size: 0, min: 1 })
            }
        }
    }

    fn settings() -> AppSettings {
        AppSettings {
            name: "zeus".to_string(),
            environment: Environment::Testing,
            hosts: vec!["localhost".to_string()],
            scheme: Scheme::Http,
            port: 1111,
            graceful_timeout: 1,
        }
    }

    fn app_with(users: Vec<User>, healthy: bool) -> NormalizePath<Router> {
        let state = Arc::new(AppState {
            user_creator: Arc::new(StubCreator),
            user_getter: Arc::new(StubGetter { users }),
            health: Arc::new(StubHealth(healthy)),
        });
        build_app(state, &settings()).unwrap()
    }

    async fn send(app: NormalizePath<Router>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: NormalizePath<Router>, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(app_with(vec![], true), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK\n");
    }

    #[tokio::test]
    async fn unhealthy_database_is_unavailable() {
        let (status, _) = send(app_with(vec![], false), get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn create_returns_the_public_user() {
        let (status, body) = send_json(
            app_with(vec![], true),
            post_json("/v1/user", r#"{"name":"Ada","username":"ada","age":36}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let user = body["user"].as_object().unwrap();
        assert_eq!(user["name"], "Ada");
        assert_eq!(user["username"], "ada");
        assert_eq!(user["age"], 36);
        assert!(Uuid::parse_str(user["id"].as_str().unwrap()).is_ok());
        assert!(!user.contains_key("created_at"));
    }

    #[tokio::test]
    async fn create_rejects_bad_payloads() {
        for payload in [
            r#"{"name":"Ada","username":"ada"}"#,
            r#"{"name":"Ada","username":"ada","age":0}"#,
            r#"{"name":"","username":"ada","age":36}"#,
            r#"{"name":"Ada","username":"ada","age":"old"}"#,
            r#"{"name":"Ada""#,
        ] {
            let (status, body) =
                send_json(app_with(vec![], true), post_json("/v1/user", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body, json!({ "message": "ERR_INVALID_REQUEST" }), "{payload}");
        }
    }

    #[tokio::test]
    async fn create_surfaces_domain_errors() {
        let (status, body) = send_json(
            app_with(vec![], true),
            post_json("/v1/user", r#"{"name":"Kid","username":"kid","age":12}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "ERR_USER_BELOW_AGE" }));

        let (_, body) = send_json(
            app_with(vec![], true),
            post_json("/v1/user", r#"{"name":"Ada","username":"taken","age":30}"#),
        )
        .await;
        assert_eq!(body, json!({ "message": "ERR_EXISTING_USERNAME" }));
    }

    #[tokio::test]
    async fn get_by_id_finds_the_user() {
        let user = User::new("Ada", "ada", 36);
        let uri = format!("/v1/user/{}", user.id);

        let (status, body) = send_json(app_with(vec![user.clone()], true), get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], user.id.to_string());
    }

    #[tokio::test]
    async fn trailing_slash_reaches_the_same_route() {
        let user = User::new("Ada", "ada", 36);
        let uri = format!("/v1/user/{}/", user.id);

        let (status, _) = send(app_with(vec![user], true), get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_are_rejected() {
        let uri = format!("/v1/user/{}", Uuid::now_v7());
        let (status, body) = send_json(app_with(vec![], true), get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "ERR_USER_NOT_EXISTS" }));

        let (status, body) = send_json(app_with(vec![], true), get("/v1/user/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "ERR_INVALID_REQUEST" }));
    }

    #[tokio::test]
    async fn list_filters_and_never_returns_null() {
        let users = vec![User::new("A", "alice", 20), User::new("B", "bob", 21)];

        let (status, body) =
            send_json(app_with(users.clone(), true), get("/v1/user?username=ali")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 1);
        assert_eq!(body["users"][0]["username"], "alice");

        let (_, body) = send_json(app_with(users, true), get("/v1/user?username=zed")).await;
        assert_eq!(body, json!({ "users": [] }));
    }

    #[tokio::test]
    async fn list_requires_a_username() {
        for uri in ["/v1/user", "/v1/user?username="] {
            let (status, body) = send_json(app_with(vec![], true), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({ "message": "ERR_INVALID_REQUEST" }), "{uri}");
        }
    }

    #[tokio::test]
    async fn handler_panics_become_generic_errors() {
        let (status, body) = send_json(app_with(vec![], true), get("/v1/user?username=boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "ERR_GENERIC" }));
    }

    #[tokio::test]
    async fn cors_allows_only_configured_origins() {
        let allowed = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost")
            .body(Body::empty())
            .unwrap();
        let response = app_with(vec![], true).oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost"
        );

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/v1/user")
            .header(header::ORIGIN, "http://localhost")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-request-id")
            .body(Body::empty())
            .unwrap();
        let response = app_with(vec![], true).oneshot(preflight).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");

        let foreign = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app_with(vec![], true).oneshot(foreign).await.unwrap();
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
