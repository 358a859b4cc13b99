use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use busticket_flow::{BookingFlow, QrNavigation, ViewState};
use busticket_models::{BookingDraft, BookingRecord};
use busticket_qr::{PngRenderer, QrRenderer, RenderOptions};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::version_string;

#[derive(Debug, Clone)]
struct AppState {
    flow: BookingFlow,
    qr_options: RenderOptions,
}

type ApiError = (StatusCode, String);

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Navigation state arrives as an optional JSON body. Anything that does not
/// parse is treated as no state at all.
fn navigation_state<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(state) => Some(state),
        Err(e) => {
            debug!("Ignoring navigation state: {e}");
            None
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": version_string()
    }))
}

async fn api_get_draft(State(state): State<AppState>) -> Json<BookingDraft> {
    Json(state.flow.load_draft())
}

async fn api_put_draft(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<BookingDraft>, ApiError> {
    state.flow.save_draft(&draft).map_err(internal)?;
    Ok(Json(draft))
}

async fn api_book(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<BookingRecord>, ApiError> {
    state.flow.save_draft(&draft).map_err(internal)?;
    let booking = draft
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    state.flow.submit(booking).map(Json).map_err(internal)
}

async fn api_ticket(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let navigation = navigation_state::<BookingRecord>(&body);
    match state.flow.activate_ticket_view(navigation) {
        ViewState::Resolved { data, source } => Ok(Json(json!({
            "ticket": data.ticket,
            "qrData": data.qr_data,
            "source": source,
        }))),
        other => Err(internal(format!("ticket view did not resolve: {other:?}"))),
    }
}

async fn api_qr(State(state): State<AppState>, body: Bytes) -> Response {
    let navigation = navigation_state::<QrNavigation>(&body);
    let (qr_data, source) = match state.flow.activate_qr_view(navigation) {
        ViewState::Resolved { data, source } => (data, source),
        ViewState::Redirect(to) => return Redirect::to(to).into_response(),
        ViewState::AwaitingInput => return StatusCode::NO_CONTENT.into_response(),
    };

    // Encode only once the payload is final.
    let payload = qr_data.clone();
    let options = state.qr_options;
    let encoded = tokio::task::spawn_blocking(move || PngRenderer.render(&payload, &options)).await;
    let image = match encoded {
        Ok(Ok(image)) => Some(image.data_url()),
        Ok(Err(e)) => {
            error!("QR encoding failed: {e}");
            None
        }
        Err(e) => {
            error!("QR encoding task failed: {e}");
            None
        }
    };

    Json(json!({
        "qrData": qr_data,
        "source": source,
        "image": image,
    }))
    .into_response()
}

async fn api_clear(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.flow.store().clear().map_err(internal)?;
    Ok(Json(json!({ "status": "ok" })))
}

fn router(flow: BookingFlow, qr_options: RenderOptions) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/draft", get(api_get_draft).put(api_put_draft))
        .route("/bookings", post(api_book))
        .route("/ticket", post(api_ticket))
        .route("/qr", post(api_qr))
        .route("/storage", delete(api_clear));

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(AppState { flow, qr_options })
}

pub async fn run(port: u16, flow: BookingFlow, qr_options: RenderOptions) -> anyhow::Result<()> {
    info!("busticket v{}", version_string());

    let app = router(flow, qr_options);

    let addr = format!("0.0.0.0:{port}");
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
