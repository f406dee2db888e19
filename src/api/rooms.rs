use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post, put},
    Json, Router,
};

use crate::auth::PairedRoom;
use crate::error::{AppError, Result};
use crate::models::{
    CloseResponse, LockResponse, RefreshResponse, RoomStatus, SetCodeRequest, SetCodeResponse,
    SetMuteRequest,
};
use crate::platform::MuteLevel;
use crate::state::AppState;

/// Routes for paired clients. Every route resolves its room from the bearer key.
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_room).delete(close_room))
        .route("/alive", post(keep_alive))
        .route("/code", put(set_code))
        .route("/mute", put(set_mute))
        .route("/lock", post(toggle_lock))
}

/// GET /api/v1/room - Current room state
async fn get_room(PairedRoom(room): PairedRoom) -> Result<Json<RoomStatus>> {
    let snapshot = room.snapshot().await;
    Ok(Json(RoomStatus::new(&room, snapshot)))
}

/// POST /api/v1/room/alive - Liveness heartbeat
async fn keep_alive(PairedRoom(room): PairedRoom) -> Result<Json<RoomStatus>> {
    room.touch().await;
    let snapshot = room.snapshot().await;
    Ok(Json(RoomStatus::new(&room, snapshot)))
}

/// PUT /api/v1/room/code - Attach the game's room code
async fn set_code(
    PairedRoom(room): PairedRoom,
    Json(request): Json<SetCodeRequest>,
) -> Result<Json<SetCodeResponse>> {
    let accepted = room.set_code(&request.code).await;
    Ok(Json(SetCodeResponse { accepted }))
}

/// PUT /api/v1/room/mute - Change the mute level and apply it right away
async fn set_mute(
    PairedRoom(room): PairedRoom,
    payload: std::result::Result<Json<SetMuteRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let level = MuteLevel::try_from(request.level).map_err(AppError::BadRequest)?;

    room.set_mute_level(level).await;
    let report = room.refresh().await;

    tracing::info!(
        owner = %room.owner(),
        level = request.level,
        muted = report.muted.len(),
        "Mute level applied"
    );
    Ok(Json(report.into()))
}

/// POST /api/v1/room/lock - Toggle the room lock
async fn toggle_lock(PairedRoom(room): PairedRoom) -> Result<Json<LockResponse>> {
    let outcome = room.lock_toggle().await;
    Ok(Json(outcome.into()))
}

/// DELETE /api/v1/room - Close the room
async fn close_room(PairedRoom(room): PairedRoom) -> Result<Json<CloseResponse>> {
    let outcome = room.close().await;
    Ok(Json(outcome.into()))
}
