//! Request observability: one tracing span per request, Prometheus series
//! per route, and hardening headers on every response.

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field, info, info_span};
use uuid::Uuid;

use crate::api::AppState;

/// GET /metrics
/// Prometheus exposition text, or a hint when no recorder is installed
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.prometheus_handle {
        Some(handle) => handle.render(),
        None => "Metrics are disabled; set metrics_enabled under [observability]".to_string(),
    }
}

/// Wraps every request in a `request` span and emits one completion line
/// plus the request counters. The span starts with a fresh request id;
/// `account_id` stays empty until the auth middleware resolves a bearer
/// token and fills it in.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %path,
        route = route.as_deref(),
        account_id = field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let status = response.status();
        let latency = started.elapsed();

        // Label by route template, not raw path, so ids in the URL cannot
        // blow up the label set.
        let labels = [
            ("method", method.to_string()),
            ("route", route.unwrap_or(path)),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(latency.as_secs_f64());

        info!(
            status = status.as_u16(),
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    // This API serves JSON only, so everything can stay locked down.
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'; base-uri 'none'",
    ),
];

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    for (name, value) in SECURITY_HEADERS {
        response
            .headers_mut()
            .insert(name, HeaderValue::from_static(value));
    }

    response
}
