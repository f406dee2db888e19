use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::error::AppError;
use crate::room::Room;
use crate::state::AppState;

/// Room resolved from the `Authorization: Bearer <room secret>` header a
/// paired client sends.
pub struct PairedRoom(pub Arc<Room>);

impl FromRequestParts<AppState> for PairedRoom {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Room key missing".to_string()))?;

        let room = state
            .registry
            .find_by_secret(bearer.token())
            .ok_or_else(|| AppError::Unauthorized("Unknown room key".to_string()))?;

        Ok(PairedRoom(room))
    }
}
