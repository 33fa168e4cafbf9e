use crate::AppState;
use crate::error::AppError;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use recording_catalog_proto::sidecar;
use recording_catalog_proto::{RecordFilter, RecordingStatus, RoomMetadata};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Topic of the data packet sent to a room after one of its recordings is deleted
pub const RECORDING_DELETED_TOPIC: &str = "RECORDING_DELETED";

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/recordings", get(handle_list_recordings))
        .route("/recordings/start", post(handle_start_recording))
        .route("/recordings/stop", post(handle_stop_recording))
        .route(
            "/recordings/{name}",
            get(handle_get_recording).delete(handle_delete_recording),
        )
        .route("/recordings/{name}/url", get(handle_get_recording_url))
        .route("/rooms", post(handle_create_room))
        .route("/livekit/webhook", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    room_name: Option<String>,
    room_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RoomRequest {
    room_name: Option<String>,
}

/// `roomName` from a JSON body; missing, empty or unparsable bodies are a
/// validation error.
fn required_room_name(body: &[u8]) -> Result<String, AppError> {
    serde_json::from_slice::<RoomRequest>(body)
        .unwrap_or_default()
        .room_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::validation("roomName is required"))
}

async fn handle_list_recordings(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = RecordFilter::new(query.room_name, query.room_id);
    let recordings = state.catalog.list(&filter).await?;
    debug!("Listed {} recordings for {:?}", recordings.len(), filter);
    Ok(Json(json!({ "recordings": recordings })))
}

async fn handle_get_recording(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let recording = state.catalog.stream_range(&name, range).await?;

    let Some(window) = recording.range else {
        // Empty object: nothing to window
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "video/mp4"),
                (header::ACCEPT_RANGES, "bytes"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::empty(),
        )
            .into_response());
    };

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", window.start, window.end, recording.size),
            ),
            (header::CONTENT_LENGTH, window.len().to_string()),
        ],
        Body::from_stream(recording.body),
    )
        .into_response())
}

async fn handle_get_recording_url(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.catalog.exists(&name).await? {
        return Err(AppError::not_found("Recording not found"));
    }

    let recording_url = state.playback.playback_url(&state.catalog, &name).await?;
    Ok(Json(json!({ "recordingUrl": recording_url })))
}

async fn handle_delete_recording(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = state.catalog.delete(&name).await?;

    // Let participants of the recording's room refresh their lists
    match record {
        Some(record) if !record.room_name.is_empty() => {
            notify_recording_deleted(&state, &record.room_name, &name).await
        }
        _ => debug!("No room to notify about deletion of {}", name),
    }

    Ok(Json(json!({ "message": "Recording deleted" })))
}

async fn notify_recording_deleted(state: &AppState, room_name: &str, recording_name: &str) {
    match state.rooms.get_room(room_name).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!("Room {} is gone, skipping deletion notice", room_name);
            return;
        }
        Err(e) => {
            warn!("Could not look up room {}: {}", room_name, e);
            return;
        }
    }

    let payload = json!({ "recordingName": recording_name }).to_string();
    if let Err(e) = state
        .rooms
        .send_data(room_name, payload.into_bytes(), RECORDING_DELETED_TOPIC)
        .await
    {
        warn!("Failed to notify room {} of deleted recording: {}", room_name, e);
    }
}

async fn handle_start_recording(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let room_name = required_room_name(&body)?;

    let active = state.egress.list_active(&room_name).await?;
    if !active.is_empty() {
        return Err(AppError::conflict("Recording already started for this room"));
    }

    let filepath = state.catalog.layout().egress_filepath();
    let egress = state
        .egress
        .start_room_composite(&room_name, &filepath)
        .await?;
    info!("🎬 Recording started in room {} ({})", room_name, egress.egress_id);

    Ok(Json(json!({
        "message": "Recording started",
        "recording": sidecar::summarize(&egress),
    })))
}

async fn handle_stop_recording(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let room_name = required_room_name(&body)?;

    let active = state.egress.list_active(&room_name).await?;
    let Some(current) = active.first() else {
        return Err(AppError::conflict("Recording not started for this room"));
    };

    let egress = state.egress.stop_egress(&current.egress_id).await?;
    info!("⏹️ Recording stopped in room {} ({})", room_name, egress.egress_id);

    Ok(Json(json!({
        "message": "Recording stopped",
        "recording": sidecar::summarize(&egress),
    })))
}

async fn handle_create_room(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let room_name = required_room_name(&body)?;

    if let Some(room) = state.rooms.get_room(&room_name).await? {
        debug!("Room {} already exists", room_name);
        return Ok(Json(json!({ "room": room })));
    }

    let metadata = RoomMetadata::new(state.app_name.clone(), RecordingStatus::Stopped)
        .to_json()
        .map_err(AppError::internal)?;
    let room = state.rooms.create_room(&room_name, &metadata).await?;
    info!("🏠 Created room {}", room_name);

    Ok(Json(json!({ "room": room })))
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let event = state.webhooks.receive(&body, authorization).map_err(|e| {
        warn!("Rejected webhook: {}", e);
        AppError::Unauthorized("Invalid webhook signature".to_string())
    })?;

    let outcome = state.bridge.handle(&event).await;
    debug!("Webhook {} ({}): {:?}", event.id, event.event, outcome);
    Ok(StatusCode::OK)
}
