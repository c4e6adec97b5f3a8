//! HTTP bridge for an external renderer.
//!
//! Lets a thin page-side renderer drive the engine over JSON: fetch the
//! current slots, trigger a render pass, and report visibility, clicks,
//! dismissals, and page lifecycle. Callbacks for a replaced or removed
//! placement answer `404`.

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::engine::{Engine, Outcome, PendingEvents, Placement, PlacementId, ReportRow};
use crate::events::FlushStats;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: Engine,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    engine: &'static str,
}

#[derive(Serialize)]
struct SlotsResponse {
    visible: bool,
    slots: Vec<Option<Placement>>,
}

#[derive(Serialize)]
struct OutcomeResponse {
    placement: PlacementId,
    outcome: Outcome,
}

#[derive(Serialize)]
struct ReportResponse {
    ads: Vec<ReportRow>,
    pending: PendingEvents,
}

/// Body of `POST /api/placements/{id}/visibility`.
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    /// Visible fraction of the placement, 0.0 to 1.0.
    pub ratio: f64,
}

/// Body of `POST /api/placements/{id}/dismiss`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DismissRequest {
    pub permanent: bool,
}

/// Body of `POST /api/page`.
#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub visible: bool,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/api/slots", get(slots_handler))
        .route("/api/render", post(render_handler))
        .route(
            "/api/placements/{id}/visibility",
            post(visibility_handler),
        )
        .route("/api/placements/{id}/click", post(click_handler))
        .route("/api/placements/{id}/dismiss", post(dismiss_handler))
        .route("/api/page", post(page_handler))
        .route("/api/flush", post(flush_handler))
        .route("/api/report", get(report_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the bridge on `addr` until `shutdown` resolves.
pub async fn serve(
    engine: Engine,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP bridge listening");
    axum::serve(listener, create_router(AppState { engine }))
        .with_graceful_shutdown(shutdown)
        .await
}

fn outcome_response(placement: PlacementId, outcome: Outcome) -> Response {
    let status = match outcome {
        Outcome::Stale => StatusCode::NOT_FOUND,
        Outcome::Applied | Outcome::Ignored => StatusCode::OK,
    };
    (status, Json(OutcomeResponse { placement, outcome })).into_response()
}

/// Liveness probe.
async fn healthz_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        engine: if state.engine.is_closed() {
            "closed"
        } else {
            "running"
        },
    })
}

async fn slots_handler(State(state): State<AppState>) -> Json<SlotsResponse> {
    Json(SlotsResponse {
        visible: state.engine.is_visible(),
        slots: state.engine.placements().await,
    })
}

async fn render_handler(State(state): State<AppState>) -> Json<SlotsResponse> {
    let slots = state.engine.render_all().await;
    Json(SlotsResponse {
        visible: state.engine.is_visible(),
        slots,
    })
}

async fn visibility_handler(
    State(state): State<AppState>,
    Path(id): Path<PlacementId>,
    Json(body): Json<VisibilityRequest>,
) -> Response {
    outcome_response(id, state.engine.report_visibility(id, body.ratio).await)
}

async fn click_handler(State(state): State<AppState>, Path(id): Path<PlacementId>) -> Response {
    outcome_response(id, state.engine.activate(id).await)
}

async fn dismiss_handler(
    State(state): State<AppState>,
    Path(id): Path<PlacementId>,
    body: Bytes,
) -> Response {
    // The body is optional; an empty one means a non-permanent dismissal.
    let request = if body.is_empty() {
        DismissRequest::default()
    } else {
        match serde_json::from_slice::<DismissRequest>(&body) {
            Ok(request) => request,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    };
    outcome_response(id, state.engine.dismiss(id, request.permanent).await)
}

async fn page_handler(
    State(state): State<AppState>,
    Json(body): Json<PageRequest>,
) -> StatusCode {
    state.engine.set_visibility(body.visible).await;
    StatusCode::NO_CONTENT
}

async fn flush_handler(State(state): State<AppState>) -> Json<FlushStats> {
    Json(state.engine.flush().await)
}

async fn report_handler(State(state): State<AppState>) -> Json<ReportResponse> {
    Json(ReportResponse {
        ads: state.engine.report().await,
        pending: state.engine.pending_events().await,
    })
}
