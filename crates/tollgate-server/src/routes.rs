use std::convert::Infallible;

use actix_web::http::header;
use actix_web::{get, web, HttpRequest, HttpResponse};
use bytes::Bytes;
use chrono::Utc;
use futures::{future, stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;

use tollgate::{security, LifecycleEvent};

use crate::metrics;
use crate::state::GatewayState;

fn sse_event_frame(event: &LifecycleEvent) -> Bytes {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Bytes::from(format!("data: {json}\n\n"))
}

fn sse_connected_frame() -> Bytes {
    let payload = serde_json::json!({
        "type": "connected",
        "timestamp": Utc::now(),
    });
    Bytes::from(format!("event: connected\ndata: {payload}\n\n"))
}

/// Live lifecycle feed. One `connected` ack on join, then every event
/// published after the subscription — nothing is replayed.
///
/// Disconnected clients are pruned lazily: dropping this stream closes the
/// receiver, and the bus removes the dead sender on its next publish.
#[get("/events")]
pub async fn events(state: web::Data<GatewayState>) -> HttpResponse {
    let (_handle, rx) = state.bus.subscribe();
    tracing::debug!(
        observers = state.bus.subscriber_count(),
        "event feed connected"
    );

    let live = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(sse_event_frame(&event)));
    let feed = stream::once(future::ready(Ok(sse_connected_frame()))).chain(live);

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(feed)
}

#[get("/health")]
pub async fn health(state: web::Data<GatewayState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "tollgate-server",
        "pricedRoutes": state.routes.len(),
        "observers": state.bus.subscriber_count(),
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<GatewayState>) -> HttpResponse {
    match &state.config.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| security::constant_time_eq(t.as_bytes(), token.as_slice()))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            // Metrics are protected by default; unauthenticated access is
            // an explicit opt-in.
            if !state.config.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or TOLLGATE_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
