use crate::{
    api::handlers::{
        auth::{self, error::AuthError, utils::extract_client_ip, AuthState},
        health,
    },
    audit::{redact_body, Audit, LogLevel, PgAuditSink, RequestContext},
    cli::globals::GlobalArgs,
    otp::OtpService,
    ratelimit::{Decision, WindowRateLimiter},
    store::PgUserStore,
    token::TokenService,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
        HeaderName, HeaderValue, Method,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub(crate) mod handlers;
mod openapi;

pub use openapi::ApiDoc;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Largest request-body slice captured into an audit entry.
const BODY_SNAPSHOT_LIMIT: usize = 64 * 1024;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    globals: &GlobalArgs,
    auth_config: auth::AuthConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(Duration::from_secs(5))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    PgUserStore::ensure_schema(&pool)
        .await
        .context("Failed to prepare users schema")?;
    PgAuditSink::ensure_schema(&pool)
        .await
        .context("Failed to prepare logs schema")?;

    let audit = Audit::new(
        Arc::new(PgAuditSink::new(pool.clone())),
        auth_config.server_id().to_string(),
    );
    let otp = OtpService::new(auth_config.otp_issuer().to_string());
    let tokens = TokenService::new(globals.token_secret());
    let auth_state = Arc::new(AuthState::new(
        auth_config,
        Arc::new(PgUserStore::new(pool.clone())),
        audit,
        Arc::new(WindowRateLimiter::new()),
        otp,
        tokens,
    ));

    let frontend_origin = frontend_origin(auth_state.config().frontend_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    // Only the /api surface is throttled; health probes and docs are not.
    let api_routes = Router::new()
        .route("/api/register", post(handlers::auth::register::register))
        .route("/api/login", post(handlers::auth::login::login))
        .route("/api/verify-otp", post(handlers::auth::login::verify_otp))
        .route(
            "/api/recover-password",
            post(handlers::auth::password::recover_password),
        )
        .route(
            "/api/reset-password",
            post(handlers::auth::password::reset_password),
        )
        .route("/api/getInfo", get(handlers::auth::info::get_info))
        .route("/api/logs", get(handlers::auth::logs::logs))
        .route_layer(middleware::from_fn(throttle));

    let app = Router::new()
        .merge(api_routes)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Per-IP admission check in front of every /api route. Rejections are
/// themselves audited, with a redacted snapshot of the offending request.
async fn throttle(
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = extract_client_ip(request.headers());
    match state.rate_limiter().admit(client_ip.as_deref()) {
        Decision::Allowed => next.run(request).await,
        Decision::Limited { retry_after_secs } => {
            let context = request_context(request, client_ip).await;
            state
                .audit()
                .emit(
                    LogLevel::Info,
                    "rate limit exceeded",
                    json!({ "retry_after_secs": retry_after_secs }),
                    Some(context),
                )
                .await;
            AuthError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

/// Snapshot of a rejected request for the audit trail. Consumes the request;
/// only called when the response is already decided.
async fn request_context(request: Request, ip: Option<String>) -> RequestContext {
    let method = request.method().to_string();
    let url = request.uri().to_string();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(request.into_body(), BODY_SNAPSHOT_LIMIT)
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .map(redact_body);

    RequestContext {
        method,
        url,
        ip,
        user_agent,
        body,
    }
}

fn make_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(frontend_url).with_context(|| format!("Invalid frontend URL: {frontend_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Frontend URL must include a valid host: {frontend_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditSink, LogEntry, MemoryAuditSink};
    use crate::ratelimit::RateLimiter;
    use crate::store::MemoryUserStore;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use tower::Service;

    #[test]
    fn frontend_origin_strips_path_and_keeps_port() -> Result<()> {
        assert_eq!(
            frontend_origin("http://localhost:3000/app")?,
            HeaderValue::from_static("http://localhost:3000")
        );
        assert_eq!(
            frontend_origin("https://school.edu")?,
            HeaderValue::from_static("https://school.edu")
        );
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_garbage() {
        assert!(frontend_origin("not a url").is_err());
    }

    #[tokio::test]
    async fn request_context_snapshot_redacts_credentials() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/login")
            .header(USER_AGENT, "test-agent")
            .body(Body::from(
                r#"{"email":"a@school.edu","password":"hunter2"}"#,
            ))
            .expect("request");

        let context = request_context(request, Some("1.2.3.4".to_string())).await;
        assert_eq!(context.method, "POST");
        assert_eq!(context.url, "/api/login");
        assert_eq!(context.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(context.user_agent.as_deref(), Some("test-agent"));

        let body = context.body.expect("body snapshot");
        assert_eq!(body["email"], "a@school.edu");
        assert_eq!(body["password"], "[redacted]");
    }

    #[tokio::test]
    async fn request_context_tolerates_non_json_bodies() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/login")
            .body(Body::from("not json"))
            .expect("request");

        let context = request_context(request, None).await;
        assert!(context.body.is_none());
        assert!(context.ip.is_none());
        assert!(context.user_agent.is_none());
    }

    fn throttled_app(sink: Arc<dyn AuditSink>, limiter: Arc<dyn RateLimiter>) -> Router {
        let state = Arc::new(AuthState::new(
            auth::AuthConfig::new("http://localhost:3000".to_string()),
            Arc::new(MemoryUserStore::new()),
            Audit::new(sink, "server-1".to_string()),
            limiter,
            OtpService::new("AulaPass".to_string()),
            TokenService::new(&SecretString::from("test-signing-key".to_string())),
        ));

        Router::new()
            .route("/api/login", post(handlers::auth::login::login))
            .route_layer(middleware::from_fn(throttle))
            .layer(Extension(state))
    }

    fn login_request() -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::from(
                r#"{"email":"a@school.edu","password":"hunter2"}"#,
            ))
            .expect("request")
    }

    #[tokio::test]
    async fn throttle_rejects_over_limit_and_audits() -> Result<()> {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut app = throttled_app(
            sink.clone(),
            Arc::new(WindowRateLimiter::with_limits(Duration::from_secs(60), 1)),
        );

        let first = app.call(login_request()).await.expect("first request");
        assert_ne!(first.status(), StatusCode::TOO_MANY_REQUESTS);

        let second = app.call(login_request()).await.expect("second request");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after = second
            .headers()
            .get(axum::http::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .context("missing Retry-After header")?;
        assert!(retry_after >= 1);

        let bytes = axum::body::to_bytes(second.into_body(), usize::MAX).await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], "rate limit exceeded");
        assert!(body["retry_after_secs"].as_u64().is_some());

        let entries = sink.entries();
        let entry = entries
            .iter()
            .find(|entry| entry.message == "rate limit exceeded")
            .context("missing rate limit audit entry")?;
        assert_eq!(entry.level, LogLevel::Info);
        let context = entry.request.as_ref().context("missing request context")?;
        assert_eq!(context.method, "POST");
        assert_eq!(context.url, "/api/login");
        assert_eq!(context.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(context.body.as_ref().and_then(|b| b.get("password")), Some(&json!("[redacted]")));
        Ok(())
    }

    #[tokio::test]
    async fn throttle_replies_even_when_the_sink_fails() -> Result<()> {
        struct FailingAuditSink;

        #[async_trait::async_trait]
        impl AuditSink for FailingAuditSink {
            async fn record(&self, _entry: LogEntry) -> Result<()> {
                Err(anyhow!("sink unavailable"))
            }

            async fn recent(&self, _limit: i64) -> Result<Vec<LogEntry>> {
                Ok(Vec::new())
            }

            async fn summary(&self) -> Result<crate::audit::Summary> {
                Ok(crate::audit::Summary::new())
            }
        }

        let mut app = throttled_app(
            Arc::new(FailingAuditSink),
            Arc::new(WindowRateLimiter::with_limits(Duration::from_secs(60), 1)),
        );

        let first = app.call(login_request()).await.expect("first request");
        assert_ne!(first.status(), StatusCode::TOO_MANY_REQUESTS);

        let second = app.call(login_request()).await.expect("second request");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(second.into_body(), usize::MAX).await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], "rate limit exceeded");
        Ok(())
    }
}
