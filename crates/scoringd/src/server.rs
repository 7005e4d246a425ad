//! HTTP server for scoringd

use crate::api::MethodApi;
use crate::config::ServerConfig;
use crate::context::ExecutionContext;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use http_body_util::Full;
use scoring_shared::rpc::{BAD_REQUEST, INTERNAL_ERROR, NOT_FOUND};
use scoring_shared::ApiResponse;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state shared across handlers
pub struct AppState {
    pub api: MethodApi,
}

impl AppState {
    pub fn new(api: MethodApi) -> Self {
        Self { api }
    }
}

type AppStateArc = Arc<AppState>;

pub fn router(state: AppStateArc, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/method", post(method_route))
        .fallback(not_found)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}

fn reply(response: &ApiResponse) -> Response {
    let status = StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.to_body())).into_response()
}

async fn method_route(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut ctx = ExecutionContext::new(request_id(&headers));
    info!(
        "/method: {} {}",
        String::from_utf8_lossy(&body),
        ctx.request_id
    );

    let response = match serde_json::from_slice::<Value>(&body) {
        Ok(request @ Value::Object(_)) => state.api.handle(&request, &mut ctx),
        _ => ApiResponse::status(BAD_REQUEST),
    };

    let mut log = ctx.to_value();
    if let (Some(fields), Value::Object(body)) = (log.as_object_mut(), response.to_body()) {
        fields.extend(body);
    }
    info!("{}", log);

    reply(&response)
}

async fn not_found() -> Response {
    reply(&ApiResponse::status(NOT_FOUND))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> HttpResponse<Full<Bytes>> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Unexpected error: {}", detail);

    let body = ApiResponse::status(INTERNAL_ERROR).to_body().to_string();
    let mut response = HttpResponse::new(Full::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Run the HTTP server until Ctrl-C
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = router(Arc::new(state), config.max_body_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting server at {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
