//! Minimal axum HTTP surface: `GET /status` (point-in-time snapshot) and
//! `GET /events` (server-sent event-bus stream) for the operator.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::DashboardConfig;
use crate::state::DashboardState;

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/events", get(events_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.snapshot())
}

async fn events_handler(
    State(state): State<DashboardState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.subscribe();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_else(|_| "null".into());
                    return Some((Ok(SseEvent::default().data(json)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE subscriber lagged, dropping oldest events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn run_server(state: DashboardState, config: DashboardConfig) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await
}
