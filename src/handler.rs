//! Trigger-shaped request handling.
//!
//! `handle_event` is the single entry point shared by the HTTP server and the invoke
//! binary. Order per invocation: origin gate, preflight short-circuit, open an
//! authenticated drive session, resolve, shape the response. Every path returns a
//! well-formed JSON response; nothing is retried.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};

use crate::access::{cors_headers, origin_header, preflight_headers, AccessPolicy};
use crate::drive::DriveBackend;
use crate::error::{AppError, AppResult};
use crate::resolver::{Mode, Resolution, Resolver, ResolverConfig, Scope};

pub const DEFAULT_CACHE_CONTROL: &str = "max-age=3600, stale-while-revalidate=86400";
const JSON_CONTENT_TYPE: &str = "application/json";

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_parameters: PathParameters,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_context: RequestContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathParameters {
    #[serde(default)]
    pub post: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub domain_name: String,
}

impl TriggerEvent {
    pub fn is_preflight(&self) -> bool {
        self.http_method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl TriggerResponse {
    fn json(status_code: u16, mut headers: BTreeMap<String, String>, body: String) -> Self {
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        Self { status_code, headers, multi_value_headers: BTreeMap::new(), body }
    }

    /// Error response. Access denials carry no headers at all so the allow-list is not confirmed.
    pub fn error(err: &AppError, headers: BTreeMap<String, String>) -> Self {
        let body = err.to_body().to_string();
        match err {
            AppError::AccessDenied { .. } => {
                Self { status_code: err.http_status(), headers: BTreeMap::new(), multi_value_headers: BTreeMap::new(), body }
            }
            _ => Self::json(err.http_status(), headers, body),
        }
    }

    pub fn preflight(origin: Option<&str>) -> Self {
        Self { status_code: 204, headers: preflight_headers(origin), multi_value_headers: BTreeMap::new(), body: String::new() }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

/// Everything a deployment needs per invocation. Immutable; shared across requests.
#[derive(Debug)]
pub struct AppState<B> {
    pub backend: B,
    pub access: AccessPolicy,
    pub resolver: ResolverConfig,
    /// `None` disables the client cache hint.
    pub cache_control: Option<String>,
}

impl<B> AppState<B> {
    pub fn new(backend: B, access: AccessPolicy, resolver: ResolverConfig) -> Self {
        Self { backend, access, resolver, cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()) }
    }

    pub fn with_cache_control(mut self, cache_control: Option<String>) -> Self {
        self.cache_control = cache_control;
        self
    }
}

pub async fn handle_event<B: DriveBackend>(state: &AppState<B>, event: &TriggerEvent) -> TriggerResponse {
    let started = Instant::now();
    let origin = origin_header(&event.headers);
    let domain = event.request_context.domain_name.as_str();

    if let Err(err) = state.access.check(origin, domain) {
        warn!(target: "drivepress", origin = origin.unwrap_or("<none>"), domain = domain, path = %event.path, "origin rejected");
        return TriggerResponse::error(&err, BTreeMap::new());
    }
    if event.is_preflight() {
        return TriggerResponse::preflight(origin);
    }

    let scope = Scope::from_route(&event.path, event.path_parameters.post.as_deref());
    let mode = Mode::from_selector(event.path_parameters.post.as_deref());
    let cors = cors_headers(origin);

    let response = match resolve_request(state, scope, mode).await {
        Ok(resolution) => match serde_json::to_string(&resolution) {
            Ok(body) => {
                let mut headers = cors;
                if let Some(cc) = &state.cache_control {
                    headers.insert("Cache-Control".to_string(), cc.clone());
                }
                TriggerResponse::json(200, headers, body)
            }
            Err(e) => TriggerResponse::error(&AppError::internal("serialize_error".to_string(), e.to_string()), cors),
        },
        Err(err) => {
            error!(target: "drivepress", scope = scope.as_str(), mode = mode.label(), status = err.http_status(), "request failed: {}", err);
            TriggerResponse::error(&err, cors)
        }
    };

    info!(
        target: "drivepress",
        scope = scope.as_str(),
        mode = mode.label(),
        status = response.status_code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "handled"
    );
    response
}

async fn resolve_request<B: DriveBackend>(state: &AppState<B>, scope: Scope, mode: Mode<'_>) -> AppResult<Resolution> {
    let session = state.backend.open().await.map_err(|e| state.resolver.map_drive_error(e))?;
    Resolver::new(&session, &state.resolver).resolve(scope, mode).await
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod handler_tests;
