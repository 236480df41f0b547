//!
//! drivepress HTTP server
//! ----------------------
//! Axum front end for long-running deployments. Each route turns the incoming HTTP
//! request into the same trigger event the serverless entry point receives and hands
//! it to `handler::handle_event`, so both deployments share one code path.
//!
//! Routes:
//! - `GET /` health text
//! - `GET|OPTIONS /posts`, `/posts/{post}`: blog scope
//! - `GET|OPTIONS /recipes`, `/recipes/{post}`: recipes scope

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::drive::{DriveBackend, MemoryDrive};
use crate::handler::{handle_event, AppState, PathParameters, RequestContext, TriggerEvent, TriggerResponse};

/// Startup summary, first thing logged so misconfigured deployments are obvious.
fn log_startup(cfg: &AppConfig) {
    let folders: Vec<String> = cfg
        .resolver
        .scopes
        .iter()
        .map(|(scope, sc)| format!("{}={}", scope.as_str(), sc.folder_id.as_deref().unwrap_or("<unscoped>")))
        .collect();
    info!(
        target: "startup",
        "drivepress starting: http_port={}, api_base='{}', fixture={:?}, folders=[{}], allowed_origins={}, staging_domain={:?}",
        cfg.http_port,
        cfg.drive.api_base,
        cfg.drive.fixture_path,
        folders.join(", "),
        cfg.access.allowed_origins.len(),
        cfg.access.staging_domain
    );
}

pub fn build_router<B: DriveBackend>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", get(|| async { "drivepress ok" }))
        .route("/posts", get(collection::<B>).options(collection::<B>))
        .route("/posts/{post}", get(item::<B>).options(item::<B>))
        .route("/recipes", get(collection::<B>).options(collection::<B>))
        .route("/recipes/{post}", get(item::<B>).options(item::<B>))
        .with_state(state)
}

/// Serve on an already-bound listener. Tests bind `127.0.0.1:0` and pass it in.
pub async fn serve_on<B: DriveBackend>(listener: tokio::net::TcpListener, state: Arc<AppState<B>>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Starting server on {}", addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// Build the configured backend and serve until the process is stopped.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    log_startup(&cfg);
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    match &cfg.drive.fixture_path {
        Some(path) => {
            let backend = MemoryDrive::from_fixture_file(path)?;
            info!(target: "startup", "serving from fixture {}", path.display());
            let state = AppState::new(backend, cfg.access.clone(), cfg.resolver.clone()).with_cache_control(cfg.cache_control.clone());
            serve_on(listener, Arc::new(state)).await
        }
        None => {
            let backend = cfg.drive.build_client()?;
            let state = AppState::new(backend, cfg.access.clone(), cfg.resolver.clone()).with_cache_control(cfg.cache_control.clone());
            serve_on(listener, Arc::new(state)).await
        }
    }
}

async fn collection<B: DriveBackend>(
    State(state): State<Arc<AppState<B>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let event = to_event(&method, &uri, &headers, None);
    into_http(handle_event(&state, &event).await)
}

async fn item<B: DriveBackend>(
    State(state): State<Arc<AppState<B>>>,
    Path(post): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let event = to_event(&method, &uri, &headers, Some(post));
    into_http(handle_event(&state, &event).await)
}

/// Host header without its port, the closest HTTP analogue of the trigger's domain name.
fn domain_from_host(headers: &HeaderMap) -> String {
    let host = headers.get("host").and_then(|v| v.to_str().ok()).unwrap_or("");
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host.to_string(),
    }
}

pub fn to_event(method: &Method, uri: &Uri, headers: &HeaderMap, post: Option<String>) -> TriggerEvent {
    let mut map = BTreeMap::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            map.insert(name.as_str().to_string(), v.to_string());
        }
    }
    TriggerEvent {
        headers: map,
        path: uri.path().to_string(),
        http_method: Some(method.as_str().to_string()),
        path_parameters: PathParameters { post },
        request_context: RequestContext { domain_name: domain_from_host(headers) },
    }
}

pub fn into_http(resp: TriggerResponse) -> Response {
    let status = StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = status;
    let headers = out.headers_mut();
    for (name, value) in resp.headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            (Ok(n), Ok(v)) => { headers.insert(n, v); }
            _ => warn!("dropping unrepresentable response header {}", name),
        }
    }
    for (name, values) in resp.multi_value_headers {
        let Ok(n) = HeaderName::from_bytes(name.as_bytes()) else { continue; };
        for value in values {
            if let Ok(v) = HeaderValue::from_str(&value) { headers.append(n.clone(), v); }
        }
    }
    out
}
