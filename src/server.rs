//! Read-only status endpoint for an external GUI shell.
//!
//! Serves the live board, the recent classification feed and the watcher
//! counters as JSON. Nothing here can mutate the board.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wb_core::{Board, BoardEvent, BoardSnapshot};
use wb_watch::{WatchCounters, WatchStats};

const DEFAULT_EVENT_LIMIT: usize = 50;

/// State shared by every route.
#[derive(Clone)]
pub struct StatusState {
    pub board: Arc<Board>,
    pub counters: Arc<WatchCounters>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    limit: Option<usize>,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/board", get(board))
        .route("/events", get(events))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Bind early so a taken port fails startup rather than a background task.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "status endpoint listening");
    Ok(listener)
}

/// Serve until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: StatusState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn board(State(state): State<StatusState>) -> Json<BoardSnapshot> {
    Json(state.board.snapshot())
}

async fn events(
    State(state): State<StatusState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<BoardEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Json(state.board.recent_events(limit))
}

async fn stats(State(state): State<StatusState>) -> Json<WatchStats> {
    Json(state.counters.snapshot())
}
