use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    cycle::{Clock, ScanCycle, SystemClock},
    radio::Radio,
    types::{Band, ChannelPoint},
};

/// Session shared between the periodic driver and the HTTP handlers.
/// Each cycle and each request holds the lock for its whole duration.
pub type SharedCycle<R, C = SystemClock> = Arc<Mutex<ScanCycle<R, C>>>;

pub struct AppState<R, C> {
    cycle: SharedCycle<R, C>,
}

impl<R, C> Clone for AppState<R, C> {
    fn clone(&self) -> Self {
        Self {
            cycle: self.cycle.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub bssid: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelsResponse {
    pub band: Band,
    pub points: Vec<ChannelPoint>,
}

pub fn router<R, C>(cycle: SharedCycle<R, C>) -> Router
where
    R: Radio + 'static,
    C: Clock + 'static,
{
    let api = Router::new()
        .route("/status", get(get_status::<R, C>))
        .route("/candidates", get(get_candidates::<R, C>))
        .route("/target", get(get_target::<R, C>))
        .route("/series", get(get_series::<R, C>))
        .route("/channels", get(get_channels::<R, C>))
        .route("/selection", post(post_selection::<R, C>))
        .with_state(AppState { cycle });

    Router::new().nest("/api", api).layer(TraceLayer::new_for_http())
}

/// Serve the API on `bind` until `shutdown` is cancelled.
pub async fn spawn_server<R, C>(
    bind: &str,
    cycle: SharedCycle<R, C>,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: Radio + 'static,
    C: Clock + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "serving API on http://{bind}/api");
    axum::serve(listener, router(cycle))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn get_status<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
) -> impl IntoResponse {
    let cycle = app.cycle.lock().await;
    (StatusCode::OK, Json(cycle.status()))
}

async fn get_candidates<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
) -> impl IntoResponse {
    let cycle = app.cycle.lock().await;
    (StatusCode::OK, Json(cycle.candidates().to_vec()))
}

async fn get_target<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
) -> impl IntoResponse {
    let cycle = app.cycle.lock().await;
    match cycle.target() {
        Some(t) => (StatusCode::OK, Json(t.clone())).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn get_series<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
) -> impl IntoResponse {
    let cycle = app.cycle.lock().await;
    (StatusCode::OK, Json(cycle.series().to_vec()))
}

async fn get_channels<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
) -> impl IntoResponse {
    let cycle = app.cycle.lock().await;
    let table = cycle.channel_table();
    let out = ChannelsResponse {
        band: table.band(),
        points: table.points(),
    };
    (StatusCode::OK, Json(out))
}

async fn post_selection<R: Radio + 'static, C: Clock + 'static>(
    State(app): State<AppState<R, C>>,
    Json(req): Json<SelectionRequest>,
) -> impl IntoResponse {
    let mut cycle = app.cycle.lock().await;
    match (req.bssid, req.label) {
        (Some(bssid), _) => cycle.selection_changed(bssid.trim()),
        (None, Some(label)) => {
            if !cycle.select_label(&label) {
                return (StatusCode::BAD_REQUEST, format!("no BSSID in label: {label}"))
                    .into_response();
            }
        }
        (None, None) => cycle.selection_changed(""),
    }
    (StatusCode::OK, Json(cycle.status())).into_response()
}
